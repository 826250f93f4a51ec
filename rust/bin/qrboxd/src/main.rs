//! `qrboxd`: the QR boxes server binary.
//!
//! Usage:
//!   qrboxd [-c <context-name-or-path>] [--listen <addr>]
//!
//! The context name resolves to `/etc/qrbox/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly. Without `-c`,
//! built-in defaults plus environment overrides are used.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use boxes::BoxesModule;
use boxes::service::BoxesConfig;
use clap::Parser;
use qrbox_core::Module;
use tracing::info;

use config::ServerConfig;

/// QR boxes server.
#[derive(Parser, Debug)]
#[command(name = "qrboxd", about = "QR boxes server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Listen address; overrides the config file and PORT.
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut server_config = match &cli.config {
        Some(name) => {
            let path = ServerConfig::resolve_path(name);
            info!("Loading configuration from {}", path.display());
            ServerConfig::load(&path)?
        }
        None => {
            info!("No config file given; using defaults and environment");
            ServerConfig::default()
        }
    };
    server_config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(listen) = cli.listen {
        server_config.server.listen = listen;
    }

    bootstrap::verify_config(&server_config)?;

    // Storage.
    let sqlite_path = server_config.sqlite_path();
    if let Some(parent) = sqlite_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let sql: Arc<dyn qrbox_sql::SQLStore> = Arc::new(
        qrbox_sql::SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("Database at {}", sqlite_path.display());

    // Modules.
    let authenticator = bootstrap::build_authenticator(&server_config.auth)?;
    let base_url = server_config.base_url();
    let boxes_module = BoxesModule::new(
        Arc::clone(&sql),
        BoxesConfig {
            public_base_url: base_url.clone(),
        },
        authenticator,
    )?;
    info!("{} module initialized, QR base URL {}", boxes_module.name(), base_url);

    let origins = bootstrap::allowed_origins(&server_config);
    let app = routes::build_router(&[&boxes_module], &origins)?;

    let listener = tokio::net::TcpListener::bind(&server_config.server.listen).await?;
    info!("qrboxd listening on {}", server_config.server.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
