//! Listener setup and graceful shutdown for the configuration server.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;

use crate::{routes, AppState, ServerSettings, DEFAULT_HOST, DEFAULT_PORT};

/// Address the server listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,

    /// Literal IP address; host names are not resolved
    pub host: String,
}

impl ApiConfig {
    /// Parses the configured host into a socket address.
    ///
    /// # Errors
    ///
    /// Returns an error naming the host when it is not an IP address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid listen host '{}'", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

impl From<&ServerSettings> for ApiConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            port: settings.port,
            host: settings.host.clone(),
        }
    }
}

/// Configuration server bound to one [`AppState`]
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    /// Binds the configured address and serves until CTRL+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address or the address
    /// cannot be bound.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    /// In-flight requests are allowed to finish.
    pub async fn serve_on<S>(self, listener: TcpListener, shutdown: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let backend = self.state.service.backend_name().to_string();
        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, backend = %backend, "Configuration server listening"),
            Err(e) => tracing::warn!(error = %e, "Listening on an unknown address"),
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Configuration server failed")?;

        tracing::info!(backend = %backend, "Configuration server stopped");
        Ok(())
    }
}

/// Resolves on CTRL+C, or SIGTERM on unix.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received CTRL+C, draining requests"),
        _ = terminate => tracing::info!("Received SIGTERM, draining requests"),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
