pub mod auth;
pub mod error;
pub mod module;
pub mod types;

pub use auth::{Authenticator, DenyAll, JwtAuthenticator, OwnerId, StaticAuthenticator, require_owner};
pub use error::ServiceError;
pub use module::Module;
pub use types::{ListResult, advance_rfc3339, new_id, now_rfc3339};
