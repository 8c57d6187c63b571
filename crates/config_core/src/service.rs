//! Configuration service pipeline.
//!
//! [`ConfigService`] ties the pieces together: it probes the backend version,
//! consults the cache and, on a miss, fetches documents, resolves them for the
//! request and merges them into a bundle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::backend::SourceBackend;
use crate::bundle::ResolvedBundle;
use crate::cache::BundleCache;
use crate::errors::{ConfigError, ConfigResult};
use crate::merger::MergeEngine;
use crate::request::{ConfigRequest, DEFAULT_LABEL, DEFAULT_PROFILE};
use crate::resolver;

/// Tunables for [`ConfigService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Upper bound for a single backend call (version probe, fetch, health
    /// check).
    pub fetch_timeout: Duration,

    /// Profile applied when a request names none.
    pub default_profile: String,

    /// Label applied when a request names none.
    pub default_label: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            default_profile: DEFAULT_PROFILE.to_string(),
            default_label: DEFAULT_LABEL.to_string(),
        }
    }
}

/// Serves resolved configuration bundles from one backend.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use config_core::{
///     BundleCache, ConfigService, FilesystemBackend, MergeEngine, ProcessEnvironment,
///     ServiceOptions,
/// };
///
/// # async fn example() -> config_core::ConfigResult<()> {
/// let service = ConfigService::new(
///     Arc::new(FilesystemBackend::new("./config")),
///     MergeEngine::new(Arc::new(ProcessEnvironment)),
///     BundleCache::new(),
///     ServiceOptions::default(),
/// );
///
/// let request = service.request("orders", "dev", None);
/// let bundle = service.resolve(&request).await?;
/// println!("{:?}", bundle.get("server.port"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConfigService {
    backend: Arc<dyn SourceBackend>,
    engine: MergeEngine,
    cache: BundleCache,
    options: ServiceOptions,
}

impl ConfigService {
    pub fn new(
        backend: Arc<dyn SourceBackend>,
        engine: MergeEngine,
        cache: BundleCache,
        options: ServiceOptions,
    ) -> Self {
        Self {
            backend,
            engine,
            cache,
            options,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Builds a request, applying the configured default profile and label
    /// where the caller supplied none.
    pub fn request(&self, application: &str, profile: &str, label: Option<&str>) -> ConfigRequest {
        ConfigRequest::with_defaults(
            application,
            profile,
            label.unwrap_or_default(),
            &self.options.default_profile,
            &self.options.default_label,
        )
    }

    /// Returns the bundle for `request`, from cache when still current.
    ///
    /// # Errors
    ///
    /// - `ConfigError::SourceUnavailable` if the backend cannot be read or a
    ///   backend call exceeds the fetch timeout
    /// - `ConfigError::DocumentNotFound` if no document applies
    /// - `ConfigError::MalformedDocument` or
    ///   `ConfigError::PlaceholderResolution` if a document cannot be merged
    #[instrument(
        skip(self, request),
        fields(
            application = %request.application(),
            profiles = %request.profile_string(),
            label = %request.label()
        )
    )]
    pub async fn resolve(&self, request: &ConfigRequest) -> ConfigResult<Arc<ResolvedBundle>> {
        let limit = self.options.fetch_timeout;
        let probe = with_timeout(limit, "version probe", self.backend.version(request.label()));

        let backend = Arc::clone(&self.backend);
        let engine = self.engine.clone();
        let owned = request.clone();
        let compute = move || async move {
            let fetched = with_timeout(
                limit,
                "fetch",
                backend.fetch(owned.application(), owned.label()),
            )
            .await?;

            let documents = resolver::resolve(&owned, &fetched.documents);
            if documents.is_empty() {
                return Err(ConfigError::DocumentNotFound {
                    application: owned.application().to_string(),
                });
            }

            debug!(
                backend = backend.name(),
                documents = documents.len(),
                version = %fetched.version,
                "Merging configuration documents"
            );
            engine.merge(&owned, fetched.version, &documents)
        };

        self.cache
            .get_or_compute(request.cache_key(), probe, compute)
            .await
            .inspect_err(|e| {
                debug!(error = %e, "Configuration resolution failed");
            })
    }

    /// Checks that the backend is reachable within the fetch timeout.
    pub async fn check_health(&self) -> ConfigResult<()> {
        with_timeout(
            self.options.fetch_timeout,
            "health check",
            self.backend.check_health(),
        )
        .await
        .inspect_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "Backend health check failed");
        })
    }
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

async fn with_timeout<T, F>(limit: Duration, operation: &str, future: F) -> ConfigResult<T>
where
    F: Future<Output = ConfigResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(ConfigError::unavailable(format!(
            "backend {} timed out after {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
