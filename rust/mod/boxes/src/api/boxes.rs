use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use qrbox_core::{Authenticator, ListResult, OwnerId, ServiceError, require_owner};

use crate::model::{AddItem, BoxChanges, BoxRecord, CreatedBox, NewBox};
use crate::service::BoxService;

type ServiceState = Arc<BoxService>;

/// Owner-scoped routes. Every request passes through `require_owner`.
pub fn router(service: Arc<BoxService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .route("/boxes", post(create_box).get(list_boxes))
        .route("/boxes/stats", get(box_stats))
        .route(
            "/boxes/{id}",
            get(get_box).put(update_box).delete(delete_box),
        )
        .route("/boxes/{id}/items", post(add_item))
        .route("/me", get(me))
        .route_layer(from_fn_with_state(auth, require_owner))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// POST /boxes
// ---------------------------------------------------------------------------

async fn create_box(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
    Json(input): Json<NewBox>,
) -> Result<(StatusCode, Json<CreatedBox>), ServiceError> {
    let record = service.create_box(&owner, input)?;
    Ok((StatusCode::CREATED, Json(CreatedBox::from(record))))
}

// ---------------------------------------------------------------------------
// GET /boxes
// ---------------------------------------------------------------------------

async fn list_boxes(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<ListResult<BoxRecord>>, ServiceError> {
    let items = service.list_boxes(&owner)?;
    let total = items.len();
    Ok(Json(ListResult { items, total }))
}

// ---------------------------------------------------------------------------
// GET /boxes/stats
// ---------------------------------------------------------------------------

async fn box_stats(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let total = service.count_for_owner(&owner)?;
    Ok(Json(serde_json::json!({
        "totalBoxes": total,
        "userId": owner,
    })))
}

// ---------------------------------------------------------------------------
// GET /boxes/{id}
// ---------------------------------------------------------------------------

async fn get_box(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<Json<BoxRecord>, ServiceError> {
    let record = service
        .get_owned_box(&owner, &id)
        .map_err(ServiceError::conceal_existence)?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// PUT /boxes/{id}
// ---------------------------------------------------------------------------

async fn update_box(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
    Json(changes): Json<BoxChanges>,
) -> Result<Json<BoxRecord>, ServiceError> {
    let record = service
        .update_box(&owner, &id, changes)
        .map_err(ServiceError::conceal_existence)?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// POST /boxes/{id}/items
// ---------------------------------------------------------------------------

async fn add_item(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
    Json(body): Json<AddItem>,
) -> Result<Json<BoxRecord>, ServiceError> {
    let record = service
        .add_item(&owner, &id, &body.item)
        .map_err(ServiceError::conceal_existence)?;
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// DELETE /boxes/{id}
// ---------------------------------------------------------------------------

async fn delete_box(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    service
        .delete_box(&owner, &id)
        .map_err(ServiceError::conceal_existence)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// GET /me
// ---------------------------------------------------------------------------

/// Caller identity as the token established it, plus how many boxes they own.
async fn me(
    State(service): State<ServiceState>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let total = service.count_for_owner(&owner)?;
    Ok(Json(serde_json::json!({
        "id": owner,
        "totalBoxes": total,
    })))
}
