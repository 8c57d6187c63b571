//! Source backends.
//!
//! A backend reads raw configuration documents from a storage medium and
//! reports a version token for the state it read. Two variants exist: a local
//! directory tree ([`FilesystemBackend`]) and a remote git repository
//! ([`GitBackend`]). Both perform blocking I/O on the blocking thread pool.

use async_trait::async_trait;

use crate::document::{BackendVersion, FetchedDocuments};
use crate::errors::{ConfigError, ConfigResult};

pub mod filesystem;
pub mod git;

pub use filesystem::FilesystemBackend;
pub use git::{GitBackend, GitBackendConfig};

/// Storage medium holding configuration documents.
///
/// Implementations must be safe to call concurrently from many requests.
#[async_trait]
pub trait SourceBackend: Send + Sync {
    /// Short backend name used in logs, e.g. `filesystem`.
    fn name(&self) -> &str;

    /// Fetches every document that may contribute to `application` at
    /// `label`, together with the version they were read at.
    ///
    /// # Errors
    ///
    /// - `ConfigError::SourceUnavailable` if the store cannot be read or the
    ///   label does not exist
    /// - `ConfigError::DocumentNotFound` if neither application-specific nor
    ///   global documents exist
    async fn fetch(&self, application: &str, label: &str) -> ConfigResult<FetchedDocuments>;

    /// Cheaply reports the current version at `label` without reading
    /// document content.
    async fn version(&self, label: &str) -> ConfigResult<BackendVersion>;

    /// Verifies the store is reachable.
    async fn check_health(&self) -> ConfigResult<()>;
}

/// Runs blocking backend work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> ConfigResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ConfigResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ConfigError::Internal {
            reason: format!("backend task failed: {}", e),
        })?
}
