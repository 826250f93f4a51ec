//! Startup checks and wiring that depends on configuration.

use std::sync::Arc;

use qrbox_core::{Authenticator, JwtAuthenticator};
use url::Url;

use crate::config::{AuthSection, ServerConfig};

/// Refuse to start on a configuration that cannot serve correct codes or
/// verify callers.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    let base = config.base_url();
    let parsed = Url::parse(&base)
        .map_err(|e| anyhow::anyhow!("QR base URL '{base}' is not a valid URL: {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        anyhow::bail!("QR base URL '{base}' must be an absolute http(s) URL");
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        anyhow::bail!("QR base URL '{base}' must not carry a query or fragment");
    }

    match (&config.auth.jwt_secret, &config.auth.jwt_public_key_pem) {
        (Some(_), Some(_)) => {
            anyhow::bail!("Set either auth.jwt_secret or auth.jwt_public_key_pem, not both.")
        }
        (None, None) => anyhow::bail!(
            "No token verification key configured.\n\
             Set auth.jwt_secret (HS256) or auth.jwt_public_key_pem (RS256)."
        ),
        _ => {}
    }

    if config.storage.data_dir.is_empty() && config.storage.sqlite_path.is_none() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    Ok(())
}

/// Build the token verifier described by the `[auth]` section.
pub fn build_authenticator(auth: &AuthSection) -> anyhow::Result<Arc<dyn Authenticator>> {
    let verifier = match (&auth.jwt_secret, &auth.jwt_public_key_pem) {
        (Some(secret), None) => JwtAuthenticator::hs256(secret.as_bytes()),
        (None, Some(pem)) => JwtAuthenticator::rs256_pem(pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("auth.jwt_public_key_pem: {e}"))?,
        _ => anyhow::bail!("exactly one token verification key must be configured"),
    };
    let verifier = match &auth.issuer {
        Some(issuer) => verifier.with_issuer(issuer),
        None => verifier,
    };
    Ok(Arc::new(verifier))
}

/// Browser origins allowed to call the API: the QR base URL's origin plus
/// any configured extras.
pub fn allowed_origins(config: &ServerConfig) -> Vec<String> {
    let mut origins = Vec::new();
    if let Ok(base) = Url::parse(&config.base_url()) {
        origins.push(base.origin().ascii_serialization());
    }
    for extra in &config.server.cors_origins {
        let extra = extra.trim().trim_end_matches('/').to_string();
        if !extra.is_empty() && !origins.contains(&extra) {
            origins.push(extra);
        }
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = Some("s3cret".into());
        config
    }

    #[test]
    fn default_config_with_secret_is_valid() {
        assert!(verify_config(&config_with_secret()).is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        let config = ServerConfig::default();
        let err = verify_config(&config).unwrap_err();
        assert!(err.to_string().contains("verification key"));
    }

    #[test]
    fn both_keys_are_rejected() {
        let mut config = config_with_secret();
        config.auth.jwt_public_key_pem = Some("-----BEGIN PUBLIC KEY-----".into());
        assert!(verify_config(&config).is_err());
    }

    #[test]
    fn relative_or_non_http_base_url_is_rejected() {
        for base in ["boxes.example", "/box", "ftp://boxes.example", "https://boxes.example/?a=1"] {
            let mut config = config_with_secret();
            config.qr.base_url = base.into();
            assert!(verify_config(&config).is_err(), "accepted {base}");
        }
    }

    #[test]
    fn base_url_with_path_prefix_is_accepted() {
        let mut config = config_with_secret();
        config.qr.base_url = "https://example.com/qr/".into();
        assert!(verify_config(&config).is_ok());
    }

    #[test]
    fn authenticator_from_secret() {
        let auth = build_authenticator(&config_with_secret().auth).unwrap();
        let err = auth.authenticate(&axum::http::HeaderMap::new()).unwrap_err();
        assert!(matches!(err, qrbox_core::ServiceError::Unauthenticated(_)));
    }

    #[test]
    fn bad_pem_fails_at_startup() {
        let auth = AuthSection {
            jwt_public_key_pem: Some("garbage".into()),
            ..Default::default()
        };
        assert!(build_authenticator(&auth).is_err());
    }

    #[test]
    fn origins_include_base_and_extras_once() {
        let mut config = config_with_secret();
        config.qr.base_url = "https://boxes.example/app/".into();
        config.server.cors_origins = vec![
            "https://admin.example/".into(),
            "https://boxes.example".into(),
        ];
        assert_eq!(
            allowed_origins(&config),
            ["https://boxes.example", "https://admin.example"]
        );
    }
}
