//! Tests for the configuration service pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::document::{is_candidate, BackendVersion, FetchedDocuments, SourceDocument};
use crate::placeholders::VariableSource;

/// In-memory backend counting its fetches.
#[derive(Default)]
struct MemoryBackend {
    files: Mutex<Vec<(String, String)>>,
    revision: AtomicUsize,
    fetches: AtomicUsize,
    delay: Duration,
    hang: bool,
}

impl MemoryBackend {
    fn with_files(files: &[(&str, &str)]) -> Self {
        let backend = Self::default();
        backend.replace(files);
        backend
    }

    fn replace(&self, files: &[(&str, &str)]) {
        *self.files.lock().unwrap() = files
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    fn current_version(&self) -> BackendVersion {
        BackendVersion::new(format!("r{}", self.revision.load(Ordering::SeqCst)))
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, application: &str, _label: &str) -> ConfigResult<FetchedDocuments> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let version = self.current_version();
        let documents: Vec<SourceDocument> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| is_candidate(name, application))
            .map(|(name, content)| SourceDocument::new(name.as_str(), content.as_bytes(), version.clone()))
            .collect();

        if documents.is_empty() {
            return Err(ConfigError::DocumentNotFound {
                application: application.to_string(),
            });
        }
        Ok(FetchedDocuments { documents, version })
    }

    async fn version(&self, _label: &str) -> ConfigResult<BackendVersion> {
        Ok(self.current_version())
    }

    async fn check_health(&self) -> ConfigResult<()> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

fn service_with(backend: Arc<MemoryBackend>, variables: HashMap<String, String>) -> ConfigService {
    let variables: Arc<dyn VariableSource> = Arc::new(variables);
    ConfigService::new(
        backend,
        MergeEngine::new(variables),
        BundleCache::new(),
        ServiceOptions {
            fetch_timeout: Duration::from_millis(500),
            ..ServiceOptions::default()
        },
    )
}

fn service(backend: Arc<MemoryBackend>) -> ConfigService {
    service_with(backend, HashMap::new())
}

#[tokio::test]
async fn profile_overlay_takes_precedence_over_defaults() {
    let backend = Arc::new(MemoryBackend::with_files(&[
        ("application.yml", "x: 1\n"),
        ("orders-dev.yml", "x: 2\n"),
    ]));
    let service = service(backend);

    let dev = service.resolve(&service.request("orders", "dev", None)).await.unwrap();
    assert_eq!(dev.get("x"), Some("2"));
    assert_eq!(dev.source_names(), vec!["orders-dev.yml", "application.yml"]);

    let prod = service.resolve(&service.request("orders", "prod", None)).await.unwrap();
    assert_eq!(prod.get("x"), Some("1"));
}

#[tokio::test]
async fn leftmost_profile_wins() {
    let backend = Arc::new(MemoryBackend::with_files(&[
        ("orders-dev.yml", "x: dev\n"),
        ("orders-cloud.yml", "x: cloud\ny: cloud\n"),
    ]));
    let service = service(backend);

    let bundle = service
        .resolve(&service.request("orders", "dev,cloud", None))
        .await
        .unwrap();
    assert_eq!(bundle.get("x"), Some("dev"));
    assert_eq!(bundle.get("y"), Some("cloud"));
}

#[tokio::test]
async fn repeated_resolution_is_deterministic() {
    let backend = Arc::new(MemoryBackend::with_files(&[
        ("application.yml", "a: 1\nb:\n  c: [x, y]\n"),
        ("orders.properties", "d=4\n"),
    ]));
    let service = service(backend);
    let request = service.request("orders", "", None);

    let first = serde_json::to_string(&*service.resolve(&request).await.unwrap()).unwrap();
    service.cache().clear().await;
    let second = serde_json::to_string(&*service.resolve(&request).await.unwrap()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn placeholders_resolve_from_variables_or_defaults() {
    let files = [("orders.yml", "greeting: ${FOO:bar}\n")];

    let unset = service(Arc::new(MemoryBackend::with_files(&files)));
    let bundle = unset.resolve(&unset.request("orders", "", None)).await.unwrap();
    assert_eq!(bundle.get("greeting"), Some("bar"));

    let variables = HashMap::from([("FOO".to_string(), "baz".to_string())]);
    let set = service_with(Arc::new(MemoryBackend::with_files(&files)), variables);
    let bundle = set.resolve(&set.request("orders", "", None)).await.unwrap();
    assert_eq!(bundle.get("greeting"), Some("baz"));
}

#[tokio::test]
async fn defaults_fill_empty_profile_and_label() {
    let backend = Arc::new(MemoryBackend::with_files(&[("orders.yml", "a: 1\n")]));
    let service = service(backend);

    let bundle = service.resolve(&service.request("orders", "", None)).await.unwrap();
    assert_eq!(bundle.profiles, vec!["default".to_string()]);
    assert_eq!(bundle.label, "main");
}

#[tokio::test]
async fn cached_bundle_is_reused_until_version_changes() {
    let backend = Arc::new(MemoryBackend::with_files(&[("orders.yml", "a: 1\n")]));
    let service = service(Arc::clone(&backend));
    let request = service.request("orders", "", None);

    let first = service.resolve(&request).await.unwrap();
    let again = service.resolve(&request).await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(backend.fetch_count(), 1);

    backend.replace(&[("orders.yml", "a: 2\n")]);
    let refreshed = service.resolve(&request).await.unwrap();
    assert_eq!(refreshed.get("a"), Some("2"));
    assert_ne!(refreshed.version, first.version);
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_fetch() {
    let backend = Arc::new(MemoryBackend {
        delay: Duration::from_millis(100),
        ..MemoryBackend::default()
    });
    backend.replace(&[("orders.yml", "a: 1\n")]);
    let service = service(Arc::clone(&backend));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let request = service.request("orders", "dev", None);
            service.resolve(&request).await
        }));
    }
    for task in tasks {
        let bundle = task.await.unwrap().unwrap();
        assert_eq!(bundle.get("a"), Some("1"));
    }

    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test]
async fn missing_application_is_not_found() {
    let backend = Arc::new(MemoryBackend::with_files(&[("billing.yml", "a: 1\n")]));
    let service = service(backend);

    let err = service
        .resolve(&service.request("orders", "", None))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::DocumentNotFound {
            application: "orders".to_string()
        }
    );
}

#[tokio::test]
async fn unrelated_documents_do_not_satisfy_a_request() {
    // "orders-eu" is a candidate file name for "orders" but matches none of
    // the requested profiles.
    let backend = Arc::new(MemoryBackend::with_files(&[("orders-eu.yml", "a: 1\n")]));
    let service = service(backend);

    let err = service
        .resolve(&service.request("orders", "dev", None))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn malformed_document_fails_only_its_own_requests() {
    let backend = Arc::new(MemoryBackend::with_files(&[
        ("orders.yml", "a: [unclosed\n"),
        ("billing.yml", "b: 1\n"),
    ]));
    let service = service(backend);

    let err = service
        .resolve(&service.request("orders", "", None))
        .await
        .unwrap_err();
    match err {
        ConfigError::MalformedDocument { source_name, .. } => assert_eq!(source_name, "orders.yml"),
        other => panic!("unexpected error: {other:?}"),
    }

    let billing = service
        .resolve(&service.request("billing", "", None))
        .await
        .unwrap();
    assert_eq!(billing.get("b"), Some("1"));
}

#[tokio::test]
async fn unresolved_placeholder_names_key_and_source() {
    let backend = Arc::new(MemoryBackend::with_files(&[(
        "orders.yml",
        "url: http://${HOST_THAT_IS_NOT_SET}/api\n",
    )]));
    let service = service(backend);

    let err = service
        .resolve(&service.request("orders", "", None))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::PlaceholderResolution {
            source_name: "orders.yml".to_string(),
            key: "url".to_string(),
            placeholder: "HOST_THAT_IS_NOT_SET".to_string(),
        }
    );
}

#[tokio::test]
async fn slow_backend_times_out_as_unavailable() {
    let backend = Arc::new(MemoryBackend {
        hang: true,
        ..MemoryBackend::default()
    });
    backend.replace(&[("orders.yml", "a: 1\n")]);
    let service = ConfigService::new(
        backend,
        MergeEngine::new(Arc::new(HashMap::<String, String>::new())),
        BundleCache::new(),
        ServiceOptions {
            fetch_timeout: Duration::from_millis(50),
            ..ServiceOptions::default()
        },
    );

    let err = service
        .resolve(&service.request("orders", "", None))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::SourceUnavailable { .. }));
    assert!(service.cache().is_empty().await);

    let health = service.check_health().await.unwrap_err();
    assert!(matches!(health, ConfigError::SourceUnavailable { .. }));
}
