//! Configuration server HTTP frontend
//!
//! This crate exposes resolved configuration bundles over HTTP. It exists in
//! the HTTP layer only and handles:
//! - HTTP request/response translation
//! - Error mapping from domain to HTTP
//! - Request tracing
//! - Routing, server settings and startup
//!
//! All resolution logic lives in `config_core`; the dependency flows
//! HTTP frontend → core, never the reverse.

use std::sync::Arc;
use std::time::Duration;

use config_core::ConfigService;

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod settings;

// Re-export key types for convenience
pub use errors::{ApiError, ErrorResponse};
pub use models::response;
pub use server::{ApiConfig, ApiServer};
pub use settings::{BackendSettings, LogFormat, ServerSettings, SettingsError};

/// Default port to listen on
pub const DEFAULT_PORT: u16 = 8888;

/// Default host to bind to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default upper bound for one HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Resolution pipeline shared by all requests
    pub service: Arc<ConfigService>,

    /// Upper bound for one HTTP request
    pub request_timeout: Duration,
}

impl AppState {
    /// Create new application state around `service`
    pub fn new(service: Arc<ConfigService>) -> Self {
        Self {
            service,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
