//! Dispute portal chat relay
//!
//! Real-time support chat for the payment-dispute intake portal:
//! - WebSocket relay for visitor/operator messaging with presence signals
//! - Durable session and message records in SQLite
//! - REST endpoints for the operator dashboard and transcript hand-off

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use api::{router, AppState};
use storage::{SqliteStore, StorageConfig};
use telemetry::{health, init_tracing_from_env};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Email service URL for transcript hand-off. Empty or "mock" skips the
    /// network call.
    #[serde(default)]
    email_url: String,

    #[serde(default)]
    storage: StorageConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            email_url: String::new(),
            storage: StorageConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting chat relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    info!(
        db_path = %config.storage.path,
        email_url = %if config.email_url.is_empty() { "mock" } else { &config.email_url },
        "Loaded configuration"
    );

    // Initialize the session store
    let store = SqliteStore::new(&config.storage)
        .await
        .context("Failed to open session store")?;
    store
        .init()
        .await
        .context("Failed to initialize store schema")?;
    let store: Arc<dyn storage::SessionStore> = Arc::new(store);

    // Check health and update status
    check_health(&config, store.as_ref()).await;

    // Create application state: the relay, the store, the mailer
    let state = AppState::new(store, &config.email_url);

    // Create router
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("RELAY")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested storage config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(path) = std::env::var("RELAY_STORAGE_PATH") {
        config.storage.path = path;
    }
    if let Ok(max) = std::env::var("RELAY_STORAGE_MAX_CONNECTIONS") {
        config.storage.max_connections = max
            .parse()
            .context("RELAY_STORAGE_MAX_CONNECTIONS must be a number")?;
    }

    // Email service URL override
    if let Ok(email_url) = std::env::var("RELAY_EMAIL_URL") {
        config.email_url = email_url;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(config: &Config, store: &dyn storage::SessionStore) {
    if store.is_healthy().await {
        health().store.set_healthy();
        info!("Session store: healthy");
    } else {
        health().store.set_unhealthy("Store probe failed");
        error!("Session store: unhealthy");
    }

    // The mailer is mock or fire-and-forget HTTP; mark it healthy when
    // configured. Actual failures surface per transcript request.
    if config.email_url.is_empty() || config.email_url == "mock" {
        health().mailer.set_healthy();
        info!("Transcript mailer: mock mode");
    } else {
        health().mailer.set_healthy();
        info!(url = %config.email_url, "Transcript mailer: configured");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
