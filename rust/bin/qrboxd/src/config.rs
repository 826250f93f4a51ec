//! Server-side configuration.
//!
//! Read from a TOML file (`/etc/qrbox/<name>.toml` or an explicit path),
//! then overridden by environment variables. Every section has defaults, so
//! an empty file is a valid local-dev config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory a bare context name resolves into.
const CONFIG_DIR: &str = "/etc/qrbox";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub qr: QrSection,

    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Browser origins allowed in addition to the QR base URL's origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Defaults to `{data_dir}/boxes.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sqlite_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrSection {
    /// Public URL scanned codes resolve against, e.g. the frontend origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for QrSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Token verification. Exactly one of `jwt_secret` (HS256) and
/// `jwt_public_key_pem` (RS256) must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_public_key_pem: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_base_url() -> String {
    "http://localhost:4321".to_string()
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    ///
    /// `dev` becomes `/etc/qrbox/dev.toml`; anything with `/` or `.` is
    /// taken as a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            Path::new(CONFIG_DIR).join(format!("{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got '{port}'"))?;
            self.server.listen = format!("0.0.0.0:{port}");
        }
        if let Some(url) = var("FRONTEND_URL") {
            self.qr.base_url = url;
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.storage.sqlite_path = Some(path);
        }
        if let Some(secret) = var("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(pem) = var("JWT_PUBLIC_KEY_PEM") {
            self.auth.jwt_public_key_pem = Some(pem);
        }
        if let Some(issuer) = var("JWT_ISSUER") {
            self.auth.issuer = Some(issuer);
        }
        Ok(())
    }

    /// QR base URL with surrounding whitespace and trailing slashes removed,
    /// so payloads never contain `//box/`.
    pub fn base_url(&self) -> String {
        self.qr.base_url.trim().trim_end_matches('/').to_string()
    }

    pub fn sqlite_path(&self) -> PathBuf {
        match &self.storage.sqlite_path {
            Some(p) => PathBuf::from(p),
            None => Path::new(&self.storage.data_dir).join("boxes.sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn resolve_bare_name() {
        assert_eq!(
            ServerConfig::resolve_path("dev"),
            PathBuf::from("/etc/qrbox/dev.toml")
        );
    }

    #[test]
    fn resolve_explicit_path() {
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("/srv/qrbox.toml"),
            PathBuf::from("/srv/qrbox.toml")
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.qr.base_url, "http://localhost:4321");
        assert_eq!(config.sqlite_path(), PathBuf::from("./data/boxes.sqlite"));
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prod.toml");
        std::fs::write(
            &path,
            r#"
[server]
listen = "127.0.0.1:9000"
cors_origins = ["https://admin.example"]

[storage]
data_dir = "/var/lib/qrbox"

[qr]
base_url = "https://boxes.example/"

[auth]
jwt_secret = "s3cret"
issuer = "https://idp.example"
"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.server.cors_origins, ["https://admin.example"]);
        assert_eq!(config.sqlite_path(), PathBuf::from("/var/lib/qrbox/boxes.sqlite"));
        assert_eq!(config.base_url(), "https://boxes.example");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.issuer.as_deref(), Some("https://idp.example"));
    }

    #[test]
    fn load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nlisten = ").unwrap();
        assert!(ServerConfig::load(&path).is_err());
        assert!(ServerConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "3000"),
                ("FRONTEND_URL", "https://qr.example"),
                ("DATABASE_PATH", "/tmp/boxes.db"),
                ("JWT_SECRET", "from-env"),
                ("JWT_ISSUER", "https://idp.example"),
            ]))
            .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert_eq!(config.base_url(), "https://qr.example");
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/boxes.db"));
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(config.auth.issuer.as_deref(), Some("https://idp.example"));
    }

    #[test]
    fn blank_env_is_ignored() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("FRONTEND_URL", "  "), ("PORT", "")])).unwrap();
        assert_eq!(config.qr.base_url, "http://localhost:4321");
        assert_eq!(config.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut config = ServerConfig::default();
        assert!(config.apply_env(env(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn base_url_strips_trailing_slashes() {
        let mut config = ServerConfig::default();
        config.qr.base_url = " https://boxes.example// ".into();
        assert_eq!(config.base_url(), "https://boxes.example");
    }
}
