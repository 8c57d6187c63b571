//! Configuration Server
//!
//! Main binary for running the configuration server.
//!
//! # Environment Variables
//!
//! - `CONFIG_SERVER_CONFIG_FILE`: Optional TOML settings file
//! - `CONFIG_SERVER_HOST`: Host to bind to (default: 0.0.0.0)
//! - `CONFIG_SERVER_PORT`: Port to listen on (default: 8888)
//! - `CONFIG_SERVER_BACKEND`: `filesystem` or `git` (default: filesystem)
//! - `CONFIG_SERVER_ROOT`: Filesystem backend root (default: ./config)
//! - `CONFIG_SERVER_GIT_URI`: Git remote, required for the git backend
//! - `CONFIG_SERVER_GIT_BASEDIR`: Local git copy (default: ./.config-server/repo)
//! - `CONFIG_SERVER_REFRESH_INTERVAL_SECS`: Minimum time between git fetches (default: 30)
//! - `CONFIG_SERVER_DEFAULT_PROFILE`: Profile for requests naming none (default: default)
//! - `CONFIG_SERVER_DEFAULT_LABEL`: Label for requests naming none (default: main)
//! - `CONFIG_SERVER_FETCH_TIMEOUT_MS`: Backend call timeout (default: 10000)
//! - `CONFIG_SERVER_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 30)
//! - `CONFIG_SERVER_CACHE_MAX_ENTRIES`: Cache bound (default: unbounded)
//! - `CONFIG_SERVER_LOG_FORMAT`: `text` or `json` (default: text)
//! - `RUST_LOG`: Log filter (default: info)

use std::sync::Arc;

use anyhow::Context;
use config_core::{BundleCache, ConfigService, MergeEngine, ProcessEnvironment};
use config_server::{ApiConfig, ApiServer, AppState, LogFormat, ServerSettings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::load().context("Failed to load server settings")?;

    init_tracing(settings.log_format);

    let backend = settings.backend.build();
    let cache = match settings.cache_max_entries {
        Some(max) => BundleCache::with_max_entries(max),
        None => BundleCache::new(),
    };
    let service = ConfigService::new(
        backend,
        MergeEngine::new(Arc::new(ProcessEnvironment)),
        cache,
        settings.service_options(),
    );

    let state = AppState::new(Arc::new(service)).with_request_timeout(settings.request_timeout());
    let config = ApiConfig::from(&settings);

    tracing::info!("Starting configuration server");
    tracing::info!("Backend: {}", settings.backend);
    tracing::info!(
        "Defaults: profile '{}', label '{}'",
        settings.default_profile,
        settings.default_label
    );

    // Start server with graceful shutdown
    ApiServer::new(config, state).serve().await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}
