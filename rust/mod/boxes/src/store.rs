use std::sync::Arc;

use qrbox_core::{OwnerId, ServiceError};
use qrbox_sql::{Row, SQLError, SQLStore, Value};

use crate::model::{BoxRecord, QrImage};

/// SQL schema for the boxes table.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS boxes (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    name        TEXT NOT NULL,
    description TEXT,
    room        TEXT,
    items       TEXT NOT NULL,
    qr_payload  TEXT NOT NULL,
    qr_png      TEXT NOT NULL,
    qr_svg      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_boxes_owner ON boxes(owner_id);
CREATE INDEX IF NOT EXISTS idx_boxes_created_at ON boxes(created_at);
";

const COLUMNS: &str = "id, owner_id, name, description, room, items, \
                       qr_payload, qr_png, qr_svg, created_at, updated_at";

/// Persistent storage for boxes, backed by SQLStore (SQLite).
///
/// Lookups by id ignore ownership; every write that touches an existing
/// row carries `owner_id` in the same statement's `WHERE` clause.
pub struct BoxStore {
    db: Arc<dyn SQLStore>,
}

impl BoxStore {
    /// Create a new BoxStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_batch(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("box schema init: {e}")))?;
        Ok(Self { db })
    }

    /// Insert a new box. A duplicate id is a `Conflict`, never an overwrite.
    pub fn create(&self, record: &BoxRecord) -> Result<(), ServiceError> {
        let items = encode_items(&record.items)?;

        self.db
            .exec(
                &format!(
                    "INSERT INTO boxes ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                &[
                    Value::from(record.id.as_str()),
                    Value::from(record.owner_id.as_str()),
                    Value::from(record.name.as_str()),
                    Value::from(record.description.clone()),
                    Value::from(record.room.clone()),
                    Value::Text(items),
                    Value::from(record.qr_payload.as_str()),
                    Value::from(record.qr_image.png_base64.as_str()),
                    Value::from(record.qr_image.svg.as_str()),
                    Value::from(record.created_at.as_str()),
                    Value::from(record.updated_at.as_str()),
                ],
            )
            .map_err(|e| match e {
                SQLError::Constraint(_) => {
                    ServiceError::Conflict(format!("box '{}' already exists", record.id))
                }
                other => ServiceError::Storage(other.to_string()),
            })?;

        Ok(())
    }

    /// Get a box by id, whoever owns it.
    pub fn get(&self, id: &str) -> Result<BoxRecord, ServiceError> {
        let rows = self
            .db
            .query(
                &format!("SELECT {COLUMNS} FROM boxes WHERE id = ?1"),
                &[Value::from(id)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("box '{id}' not found")))?;

        row_to_box(row)
    }

    /// All boxes of one owner, newest first. Insertion order breaks ties.
    pub fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<BoxRecord>, ServiceError> {
        let rows = self
            .db
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM boxes WHERE owner_id = ?1 \
                     ORDER BY created_at DESC, rowid DESC"
                ),
                &[Value::from(owner_id.as_str())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_box).collect()
    }

    /// Replace the mutable fields of the row matching `id`, `owner_id` and
    /// the `updated_at` the caller read (`expected_updated_at`). Immutable
    /// columns are never written.
    ///
    /// A missing row, a foreign row and a row changed since the read all
    /// match nothing and fail with `NotFoundOrUnauthorized`.
    pub fn update(&self, record: &BoxRecord, expected_updated_at: &str) -> Result<(), ServiceError> {
        let items = encode_items(&record.items)?;

        let affected = self
            .db
            .exec(
                "UPDATE boxes \
                 SET name = ?1, description = ?2, room = ?3, items = ?4, updated_at = ?5 \
                 WHERE id = ?6 AND owner_id = ?7 AND updated_at = ?8",
                &[
                    Value::from(record.name.as_str()),
                    Value::from(record.description.clone()),
                    Value::from(record.room.clone()),
                    Value::Text(items),
                    Value::from(record.updated_at.as_str()),
                    Value::from(record.id.as_str()),
                    Value::from(record.owner_id.as_str()),
                    Value::from(expected_updated_at),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(not_found_or_unauthorized(&record.id));
        }
        Ok(())
    }

    /// Hard-delete the row matching both `id` and `owner_id`.
    pub fn delete(&self, id: &str, owner_id: &OwnerId) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "DELETE FROM boxes WHERE id = ?1 AND owner_id = ?2",
                &[Value::from(id), Value::from(owner_id.as_str())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(not_found_or_unauthorized(id));
        }
        Ok(())
    }

    pub fn count_by_owner(&self, owner_id: &OwnerId) -> Result<u64, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) as cnt FROM boxes WHERE owner_id = ?1",
                &[Value::from(owner_id.as_str())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0)
            .max(0) as u64)
    }
}

fn not_found_or_unauthorized(id: &str) -> ServiceError {
    ServiceError::NotFoundOrUnauthorized(format!("box '{id}' not found or unauthorized"))
}

fn encode_items(items: &[String]) -> Result<String, ServiceError> {
    serde_json::to_string(items).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn required(row: &Row, col: &str) -> Result<String, ServiceError> {
    row.get_opt_string(col)
        .ok_or_else(|| ServiceError::Storage(format!("missing {col} column")))
}

/// Rebuild a BoxRecord from a `SELECT {COLUMNS}` row.
fn row_to_box(row: &Row) -> Result<BoxRecord, ServiceError> {
    let items_json = required(row, "items")?;
    let items: Vec<String> = serde_json::from_str(&items_json)
        .map_err(|e| ServiceError::Storage(format!("bad items json: {e}")))?;

    Ok(BoxRecord {
        id: required(row, "id")?,
        owner_id: OwnerId::new(required(row, "owner_id")?),
        name: required(row, "name")?,
        description: row.get_opt_string("description"),
        room: row.get_opt_string("room"),
        items,
        qr_payload: required(row, "qr_payload")?,
        qr_image: QrImage {
            png_base64: required(row, "qr_png")?,
            svg: required(row, "qr_svg")?,
        },
        created_at: required(row, "created_at")?,
        updated_at: required(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrbox_sql::SqliteStore;

    fn test_store() -> BoxStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        BoxStore::new(db).unwrap()
    }

    fn make_box(id: &str, owner: &str, created_at: &str) -> BoxRecord {
        BoxRecord {
            id: id.into(),
            owner_id: OwnerId::from(owner),
            name: format!("box {id}"),
            description: None,
            room: Some("garage".into()),
            items: vec!["x".into(), "y".into()],
            qr_payload: format!("https://boxes.example/box/{id}"),
            qr_image: QrImage {
                png_base64: "cG5n".into(),
                svg: "<svg/>".into(),
            },
            created_at: created_at.into(),
            updated_at: created_at.into(),
        }
    }

    const T1: &str = "2024-01-01T00:00:00.000000Z";
    const T2: &str = "2024-01-02T00:00:00.000000Z";
    const T3: &str = "2024-01-03T00:00:00.000000Z";

    #[test]
    fn create_and_get() {
        let store = test_store();
        let record = make_box("b1", "alice", T1);
        store.create(&record).unwrap();

        let got = store.get("b1").unwrap();
        assert_eq!(got, record);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = test_store();
        assert!(matches!(store.get("nope"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn duplicate_id_is_conflict() {
        let store = test_store();
        store.create(&make_box("b1", "alice", T1)).unwrap();
        let err = store.create(&make_box("b1", "bob", T2)).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
        assert_eq!(store.get("b1").unwrap().owner_id, OwnerId::from("alice"));
    }

    #[test]
    fn list_is_owner_scoped_and_newest_first() {
        let store = test_store();
        store.create(&make_box("old", "alice", T1)).unwrap();
        store.create(&make_box("new", "alice", T3)).unwrap();
        store.create(&make_box("mid", "alice", T2)).unwrap();
        store.create(&make_box("other", "bob", T2)).unwrap();

        let ids: Vec<String> = store
            .list_by_owner(&OwnerId::from("alice"))
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["new", "mid", "old"]);

        assert!(store.list_by_owner(&OwnerId::from("carol")).unwrap().is_empty());
    }

    #[test]
    fn equal_timestamps_list_latest_insert_first() {
        let store = test_store();
        store.create(&make_box("first", "alice", T1)).unwrap();
        store.create(&make_box("second", "alice", T1)).unwrap();
        let ids: Vec<String> = store
            .list_by_owner(&OwnerId::from("alice"))
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["second", "first"]);
    }

    #[test]
    fn update_by_owner_changes_only_mutable_fields() {
        let store = test_store();
        let original = make_box("b1", "alice", T1);
        store.create(&original).unwrap();

        let mut changed = original.clone();
        changed.name = "renamed".into();
        changed.description = Some("top shelf".into());
        changed.room = None;
        changed.items = vec!["z".into()];
        changed.updated_at = T2.into();
        // Attempts on immutable fields are ignored by the statement.
        changed.qr_payload = "https://evil.example/box/b1".into();
        changed.created_at = T3.into();
        store.update(&changed, T1).unwrap();

        let got = store.get("b1").unwrap();
        assert_eq!(got.name, "renamed");
        assert_eq!(got.description.as_deref(), Some("top shelf"));
        assert_eq!(got.room, None);
        assert_eq!(got.items, ["z"]);
        assert_eq!(got.updated_at, T2);
        assert_eq!(got.qr_payload, original.qr_payload);
        assert_eq!(got.created_at, T1);
    }

    #[test]
    fn update_by_non_owner_matches_nothing() {
        let store = test_store();
        let original = make_box("b1", "alice", T1);
        store.create(&original).unwrap();

        let mut hijack = original.clone();
        hijack.owner_id = OwnerId::from("mallory");
        hijack.name = "mine now".into();
        let err = store.update(&hijack, T1).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrUnauthorized(_)));

        let missing = make_box("ghost", "alice", T1);
        let err = store.update(&missing, T1).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrUnauthorized(_)));

        assert_eq!(store.get("b1").unwrap(), original);
    }

    #[test]
    fn update_against_stale_read_matches_nothing() {
        let store = test_store();
        let original = make_box("b1", "alice", T1);
        store.create(&original).unwrap();

        let mut first = original.clone();
        first.items.push("from first".into());
        first.updated_at = T2.into();
        store.update(&first, T1).unwrap();

        // Second writer read the record before the first write landed.
        let mut second = original.clone();
        second.items.push("from second".into());
        second.updated_at = T3.into();
        let err = store.update(&second, T1).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrUnauthorized(_)));

        assert_eq!(store.get("b1").unwrap(), first);
    }

    #[test]
    fn delete_is_owner_scoped_and_hard() {
        let store = test_store();
        store.create(&make_box("b1", "alice", T1)).unwrap();

        let err = store.delete("b1", &OwnerId::from("bob")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrUnauthorized(_)));
        assert!(store.get("b1").is_ok());

        store.delete("b1", &OwnerId::from("alice")).unwrap();
        assert!(matches!(store.get("b1"), Err(ServiceError::NotFound(_))));

        let err = store.delete("b1", &OwnerId::from("alice")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFoundOrUnauthorized(_)));
    }

    #[test]
    fn count_by_owner() {
        let store = test_store();
        assert_eq!(store.count_by_owner(&OwnerId::from("alice")).unwrap(), 0);
        store.create(&make_box("a1", "alice", T1)).unwrap();
        store.create(&make_box("a2", "alice", T2)).unwrap();
        store.create(&make_box("b1", "bob", T1)).unwrap();
        assert_eq!(store.count_by_owner(&OwnerId::from("alice")).unwrap(), 2);
        assert_eq!(store.count_by_owner(&OwnerId::from("bob")).unwrap(), 1);
    }

    #[test]
    fn items_roundtrip_preserves_order_and_duplicates() {
        let store = test_store();
        let mut record = make_box("b1", "alice", T1);
        record.items = vec!["b".into(), "a".into(), "b".into(), "émoji 📦".into()];
        store.create(&record).unwrap();
        assert_eq!(store.get("b1").unwrap().items, record.items);
    }
}
