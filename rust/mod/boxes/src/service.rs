use qrbox_core::{OwnerId, ServiceError, advance_rfc3339, now_rfc3339};
use tracing::{debug, error, info, warn};

use crate::items;
use crate::model::{BoxChanges, BoxRecord, NewBox, PublicBox};
use crate::qr;
use crate::store::BoxStore;

/// Longest accepted box name, in characters.
pub const MAX_NAME_CHARS: usize = 100;
/// Longest accepted items text (the raw multi-line input), in characters.
pub const MAX_ITEMS_TEXT_CHARS: usize = 1000;
/// Longest accepted single item for `add_item`, in characters.
pub const MAX_ITEM_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_ROOM_CHARS: usize = 100;

/// Read-modify-write attempts before a contended update gives up.
const MAX_WRITE_ATTEMPTS: u32 = 16;

/// Configuration for the box service.
#[derive(Debug, Clone)]
pub struct BoxesConfig {
    /// Externally reachable URL that resolves scanned codes, without a
    /// trailing slash. Captured into each box's payload at creation.
    pub public_base_url: String,
}

/// Box lifecycle: creation with QR identity, owner-checked mutation, and
/// the owner and public read paths.
///
/// Holds no per-request state; the store is the only shared resource.
pub struct BoxService {
    store: BoxStore,
    config: BoxesConfig,
}

impl BoxService {
    pub fn new(store: BoxStore, config: BoxesConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BoxesConfig {
        &self.config
    }

    /// Create a box owned by `owner_id`, minting its id and QR artifacts.
    ///
    /// Nothing is written if validation or QR encoding fails. If the insert
    /// fails the minted identity is dropped; a retry mints a new one.
    pub fn create_box(&self, owner_id: &OwnerId, input: NewBox) -> Result<BoxRecord, ServiceError> {
        let name = validate_name(&input.name)?;
        check_len("items", &input.items_text, MAX_ITEMS_TEXT_CHARS)?;
        let description = supplied_text("description", input.description, MAX_DESCRIPTION_CHARS)?;
        let room = supplied_text("room", input.room, MAX_ROOM_CHARS)?;

        let identity = qr::generate(&self.config.public_base_url)?;
        let now = now_rfc3339();

        let record = BoxRecord {
            id: identity.id,
            owner_id: owner_id.clone(),
            name,
            description,
            room,
            items: items::normalize(&input.items_text),
            qr_payload: identity.qr_payload,
            qr_image: identity.qr_image,
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.create(&record).inspect_err(|e| log_failure("create_box", e))?;

        info!(box_id = %record.id, owner_id = %owner_id, items = record.items.len(), "box created");
        Ok(record)
    }

    /// Look a box up by id, regardless of owner.
    pub fn get_box(&self, id: &str) -> Result<BoxRecord, ServiceError> {
        debug!(box_id = %id, "get box");
        self.store.get(id).inspect_err(|e| log_failure("get_box", e))
    }

    /// Look a box up and require `owner_id` to own it.
    pub fn get_owned_box(&self, owner_id: &OwnerId, id: &str) -> Result<BoxRecord, ServiceError> {
        let record = self.get_box(id)?;
        ensure_owner(&record, owner_id)?;
        Ok(record)
    }

    /// The projection shown to whoever scans the code.
    pub fn get_public_view(&self, id: &str) -> Result<PublicBox, ServiceError> {
        self.get_box(id).map(PublicBox::from)
    }

    /// All of an owner's boxes, newest first.
    pub fn list_boxes(&self, owner_id: &OwnerId) -> Result<Vec<BoxRecord>, ServiceError> {
        debug!(owner_id = %owner_id, "list boxes");
        self.store
            .list_by_owner(owner_id)
            .inspect_err(|e| log_failure("list_boxes", e))
    }

    /// Partially update a box. Supplied non-empty fields replace the stored
    /// ones; `items_text`, when supplied, replaces the whole list.
    pub fn update_box(
        &self,
        owner_id: &OwnerId,
        id: &str,
        changes: BoxChanges,
    ) -> Result<BoxRecord, ServiceError> {
        let name = match changes.name.filter(|s| !s.is_empty()) {
            Some(name) => Some(validate_name(&name)?),
            None => None,
        };
        let description = supplied_text("description", changes.description, MAX_DESCRIPTION_CHARS)?;
        let room = supplied_text("room", changes.room, MAX_ROOM_CHARS)?;
        let items = match changes.items_text.filter(|s| !s.is_empty()) {
            Some(text) => {
                check_len("items", &text, MAX_ITEMS_TEXT_CHARS)?;
                Some(items::normalize(&text))
            }
            None => None,
        };

        let record = self.modify("update_box", owner_id, id, |record| {
            if let Some(name) = &name {
                record.name = name.clone();
            }
            if let Some(description) = &description {
                record.description = Some(description.clone());
            }
            if let Some(room) = &room {
                record.room = Some(room.clone());
            }
            if let Some(items) = &items {
                record.items = items.clone();
            }
        })?;

        info!(box_id = %id, owner_id = %owner_id, "box updated");
        Ok(record)
    }

    /// Append one trimmed item to the end of a box's list.
    pub fn add_item(
        &self,
        owner_id: &OwnerId,
        id: &str,
        item_text: &str,
    ) -> Result<BoxRecord, ServiceError> {
        let item = item_text.trim();
        if item.is_empty() {
            return Err(ServiceError::Validation("item is required".into()));
        }
        check_len("item", item, MAX_ITEM_CHARS)?;

        let record = self.modify("add_item", owner_id, id, |record| {
            record.items.push(item.to_string());
        })?;

        info!(box_id = %id, owner_id = %owner_id, items = record.items.len(), "item added");
        Ok(record)
    }

    /// Read the caller's box, apply `change`, and write it back only if the
    /// row is still the one that was read.
    ///
    /// A lost race re-reads and re-applies, so concurrent writers never
    /// overwrite each other. A box deleted meanwhile surfaces as `NotFound`
    /// on the re-read.
    fn modify<F>(
        &self,
        op: &str,
        owner_id: &OwnerId,
        id: &str,
        mut change: F,
    ) -> Result<BoxRecord, ServiceError>
    where
        F: FnMut(&mut BoxRecord),
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut record = self.get_owned_box(owner_id, id)?;
            let read_at = record.updated_at.clone();

            change(&mut record);
            record.updated_at = advance_rfc3339(&read_at);

            match self.store.update(&record, &read_at) {
                Ok(()) => return Ok(record),
                Err(ServiceError::NotFoundOrUnauthorized(_)) => {
                    debug!(op, box_id = %id, attempt, "box changed since read, retrying");
                }
                Err(e) => {
                    log_failure(op, &e);
                    return Err(e);
                }
            }
        }

        warn!(op, box_id = %id, "gave up after {MAX_WRITE_ATTEMPTS} contended writes");
        Err(ServiceError::Conflict(format!(
            "box '{id}' is being modified concurrently"
        )))
    }

    /// Permanently remove a box. Missing and foreign boxes fail alike.
    pub fn delete_box(&self, owner_id: &OwnerId, id: &str) -> Result<(), ServiceError> {
        self.store
            .delete(id, owner_id)
            .inspect_err(|e| log_failure("delete_box", e))?;

        info!(box_id = %id, owner_id = %owner_id, "box deleted");
        Ok(())
    }

    pub fn count_for_owner(&self, owner_id: &OwnerId) -> Result<u64, ServiceError> {
        self.store
            .count_by_owner(owner_id)
            .inspect_err(|e| log_failure("count_for_owner", e))
    }
}

fn ensure_owner(record: &BoxRecord, owner_id: &OwnerId) -> Result<(), ServiceError> {
    if &record.owner_id != owner_id {
        warn!(box_id = %record.id, caller = %owner_id, "ownership check failed");
        return Err(ServiceError::Unauthorized(format!(
            "box '{}' is not owned by caller",
            record.id
        )));
    }
    Ok(())
}

fn log_failure(op: &str, err: &ServiceError) {
    match err {
        ServiceError::Storage(_) | ServiceError::Encoding(_) | ServiceError::Internal(_) => {
            error!(op, error = %err, "box operation failed");
        }
        ServiceError::NotFoundOrUnauthorized(_) => {
            warn!(op, error = %err, "owner-scoped write matched nothing");
        }
        _ => {}
    }
}

/// Trimmed name, 1..=MAX_NAME_CHARS characters.
fn validate_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("box name is required".into()));
    }
    check_len("box name", name, MAX_NAME_CHARS)?;
    Ok(name.to_string())
}

/// Whitespace-only optional text counts as not supplied: absent on create,
/// unchanged on update.
fn supplied_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ServiceError> {
    match value.filter(|s| !s.trim().is_empty()) {
        Some(v) => {
            check_len(field, &v, max)?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ServiceError> {
    if value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
