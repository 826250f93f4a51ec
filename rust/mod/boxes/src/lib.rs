pub mod api;
pub mod items;
pub mod model;
pub mod qr;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;
use qrbox_core::{Authenticator, Module, ServiceError};
use qrbox_sql::SQLStore;

use service::{BoxService, BoxesConfig};
use store::BoxStore;

/// The Boxes module: QR-labelled storage boxes and their item lists.
///
/// Owns the `boxes` table, the lifecycle service and the HTTP routes. The
/// authenticator guards every route except the public scan view.
pub struct BoxesModule {
    service: Arc<BoxService>,
    auth: Arc<dyn Authenticator>,
}

impl BoxesModule {
    /// Create the module and provision its schema.
    pub fn new(
        db: Arc<dyn SQLStore>,
        config: BoxesConfig,
        auth: Arc<dyn Authenticator>,
    ) -> Result<Self, ServiceError> {
        let store = BoxStore::new(db)?;
        Ok(Self {
            service: Arc::new(BoxService::new(store, config)),
            auth,
        })
    }

    /// The lifecycle service, for callers that skip HTTP.
    pub fn service(&self) -> &Arc<BoxService> {
        &self.service
    }
}

impl Module for BoxesModule {
    fn name(&self) -> &str {
        "boxes"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service), Arc::clone(&self.auth))
    }
}
