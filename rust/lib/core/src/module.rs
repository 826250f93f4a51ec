use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module implements this trait to register its API
/// endpoints. The binary entry point collects all modules and nests each
/// one's routes under its mount path.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Prefix the module's routes are nested under.
    fn mount_path(&self) -> &str {
        "/api"
    }

    /// Return the module's routes, already carrying their own state.
    fn routes(&self) -> Router;
}
