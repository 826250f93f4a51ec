use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use qrbox_core::ServiceError;

use crate::model::PublicBox;
use crate::service::BoxService;

/// Routes reachable by anyone holding a scanned code. No authentication.
pub fn router(service: Arc<BoxService>) -> Router {
    Router::new()
        .route("/public/boxes/{id}", get(public_box))
        .with_state(service)
}

async fn public_box(
    State(service): State<Arc<BoxService>>,
    Path(id): Path<String>,
) -> Result<Json<PublicBox>, ServiceError> {
    Ok(Json(service.get_public_view(&id)?))
}
