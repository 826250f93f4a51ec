//! Caller identity and the pluggable authenticator.
//!
//! Token verification belongs to an external identity provider. Modules
//! never see tokens: the [`require_owner`] middleware turns a verified
//! bearer token into an [`OwnerId`] and stores it in the request
//! extensions, where handlers pick it up with `Extension<OwnerId>`.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ServiceError;

/// Identity of an authenticated principal (the token subject).
///
/// Established once at the boundary and threaded explicitly into every
/// operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Pluggable authenticator. The concrete implementation is injected at
/// startup time.
pub trait Authenticator: Send + Sync + 'static {
    /// Resolve the caller from request headers, or fail with
    /// [`ServiceError::Unauthenticated`].
    fn authenticate(&self, headers: &HeaderMap) -> Result<OwnerId, ServiceError>;
}

/// Claims read from identity-provider tokens. Only `sub` is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Verifies `Authorization: Bearer <jwt>` tokens.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// HS256 with a shared secret.
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// RS256 with the identity provider's PEM-encoded public key.
    pub fn rs256_pem(pem: &[u8]) -> Result<Self, ServiceError> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| ServiceError::Validation(format!("invalid RSA public key: {e}")))?;
        Ok(Self {
            key,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// Additionally require the `iss` claim to match.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<OwnerId, ServiceError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ServiceError::Unauthenticated("missing authorization token".into()))?;

        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "rejected bearer token");
                ServiceError::Unauthenticated(format!("invalid token: {e}"))
            })?;

        if data.claims.sub.is_empty() {
            return Err(ServiceError::Unauthenticated("token has no subject".into()));
        }
        Ok(OwnerId::new(data.claims.sub))
    }
}

/// Authenticates every request as one fixed identity. Used for tests and
/// single-user local runs.
pub struct StaticAuthenticator(pub OwnerId);

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<OwnerId, ServiceError> {
        Ok(self.0.clone())
    }
}

/// An authenticator that rejects everything. Used for testing.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<OwnerId, ServiceError> {
        Err(ServiceError::Unauthenticated("access denied".into()))
    }
}

/// Middleware that authenticates the request and stores the caller's
/// [`OwnerId`] in the request extensions.
pub async fn require_owner(
    State(auth): State<Arc<dyn Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let owner = auth.authenticate(request.headers())?;
    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
