mod boxes;
mod public;

use std::sync::Arc;

use axum::Router;
use qrbox_core::Authenticator;

use crate::service::BoxService;

/// Build the complete boxes router.
///
/// Routes:
/// - `GET    /public/boxes/{id}`  public scan view (no auth)
/// - `POST   /boxes`              create box
/// - `GET    /boxes`              list caller's boxes
/// - `GET    /boxes/stats`        count caller's boxes
/// - `GET    /boxes/{id}`         full record, owner only
/// - `PUT    /boxes/{id}`         partial update
/// - `POST   /boxes/{id}/items`   append one item
/// - `DELETE /boxes/{id}`         delete box
/// - `GET    /me`                 caller identity
pub fn router(service: Arc<BoxService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .merge(boxes::router(Arc::clone(&service), auth))
        .merge(public::router(service))
}
