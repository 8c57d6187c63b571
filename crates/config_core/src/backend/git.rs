//! Remote git repository backend.
//!
//! The backend keeps a bare local copy of the remote under a base directory
//! and reads documents straight out of the commit tree a label resolves to.
//! Nothing is ever checked out, so concurrent requests for different labels
//! never share a working tree. Every write to the local copy (initialization
//! and fetches) happens on a blocking thread holding one lock, so a caller
//! that stops waiting never lets a second writer in. Fetches are throttled by
//! the configured refresh interval.
//!
//! Labels resolve, in order, to a remote branch, a tag, or any revision git
//! understands (such as a commit id). The version token is the commit id.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use git2::{Commit, Direction, FetchOptions, FetchPrune, ObjectType, Repository};
use tracing::{debug, info, warn};

use super::{run_blocking, SourceBackend};
use crate::document::{is_candidate, BackendVersion, FetchedDocuments, SourceDocument};
use crate::errors::{ConfigError, ConfigResult};

const REMOTE_NAME: &str = "origin";

const FETCH_REFSPECS: [&str; 2] = [
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
];

/// Settings for [`GitBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitBackendConfig {
    /// Remote repository URI or local path.
    pub uri: String,

    /// Directory holding the bare local copy. It is a cache and is recreated
    /// when missing or unreadable.
    pub basedir: PathBuf,

    /// Minimum time between two fetches from the remote. Zero fetches on
    /// every request.
    pub refresh_interval: Duration,
}

impl GitBackendConfig {
    pub fn new(uri: impl Into<String>, basedir: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            basedir: basedir.into(),
            refresh_interval: Duration::from_secs(30),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }
}

/// Backend serving documents from a git repository.
#[derive(Debug)]
pub struct GitBackend {
    config: GitBackendConfig,
    /// Time of the last successful fetch. Holding the lock is required to
    /// write to the local copy.
    last_fetch: Arc<Mutex<Option<Instant>>>,
}

impl GitBackend {
    pub fn new(config: GitBackendConfig) -> Self {
        Self {
            config,
            last_fetch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &GitBackendConfig {
        &self.config
    }

    /// Fetches from the remote unless the last fetch is recent enough.
    ///
    /// A failed fetch is tolerated once a previous fetch succeeded; the local
    /// copy is then served until the remote is reachable again.
    async fn refresh(&self) -> ConfigResult<()> {
        let config = self.config.clone();
        let last_fetch = Arc::clone(&self.last_fetch);
        run_blocking(move || {
            let mut last_fetch = lock_writer(&last_fetch);
            let due = match *last_fetch {
                Some(at) => at.elapsed() >= config.refresh_interval,
                None => true,
            };
            if !due {
                return Ok(());
            }

            match fetch_remote(&config) {
                Ok(()) => {
                    *last_fetch = Some(Instant::now());
                    Ok(())
                }
                Err(e) if last_fetch.is_some() => {
                    warn!(uri = %config.uri, error = %e, "Fetch failed, serving local copy");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        })
        .await
    }
}

/// Takes the writer lock. Poisoning is ignored since git guards its own
/// files with lock files.
fn lock_writer(lock: &Mutex<Option<Instant>>) -> MutexGuard<'_, Option<Instant>> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SourceBackend for GitBackend {
    fn name(&self) -> &str {
        "git"
    }

    async fn fetch(&self, application: &str, label: &str) -> ConfigResult<FetchedDocuments> {
        self.refresh().await?;
        let basedir = self.config.basedir.clone();
        let application = application.to_string();
        let label = label.to_string();
        run_blocking(move || read_documents(&basedir, &application, &label)).await
    }

    async fn version(&self, label: &str) -> ConfigResult<BackendVersion> {
        self.refresh().await?;
        let basedir = self.config.basedir.clone();
        let label = label.to_string();
        run_blocking(move || {
            let repo = open(&basedir)?;
            let commit = resolve_label(&repo, &label)?;
            Ok(BackendVersion::new(commit.id().to_string()))
        })
        .await
    }

    async fn check_health(&self) -> ConfigResult<()> {
        let config = self.config.clone();
        let last_fetch = Arc::clone(&self.last_fetch);
        run_blocking(move || {
            let _writer = lock_writer(&last_fetch);
            let repo = open_or_init(&config)?;
            let mut remote = repo
                .find_remote(REMOTE_NAME)
                .map_err(|e| unavailable(&config.uri, e))?;
            remote
                .connect(Direction::Fetch)
                .map_err(|e| unavailable(&config.uri, e))?;
            remote.disconnect().map_err(|e| unavailable(&config.uri, e))?;
            Ok(())
        })
        .await
    }
}

fn fetch_remote(config: &GitBackendConfig) -> ConfigResult<()> {
    let repo = open_or_init(config)?;
    let mut remote = repo
        .find_remote(REMOTE_NAME)
        .map_err(|e| unavailable(&config.uri, e))?;

    let mut options = FetchOptions::new();
    options.prune(FetchPrune::On);
    remote
        .fetch(&FETCH_REFSPECS, Some(&mut options), None)
        .map_err(|e| unavailable(&config.uri, e))?;

    info!(uri = %config.uri, "Fetched configuration repository");
    Ok(())
}

/// Opens the bare local copy, recreating it when it is missing, unreadable
/// or points at another remote.
fn open_or_init(config: &GitBackendConfig) -> ConfigResult<Repository> {
    if let Ok(repo) = Repository::open_bare(&config.basedir) {
        let url_matches = repo
            .find_remote(REMOTE_NAME)
            .ok()
            .and_then(|remote| remote.url().map(|url| url == config.uri))
            .unwrap_or(false);
        if url_matches {
            return Ok(repo);
        }
        if repo.find_remote(REMOTE_NAME).is_ok() {
            repo.remote_set_url(REMOTE_NAME, &config.uri)
                .map_err(|e| unavailable(&config.uri, e))?;
        } else {
            repo.remote(REMOTE_NAME, &config.uri)
                .map_err(|e| unavailable(&config.uri, e))?;
        }
        return Ok(repo);
    }

    if config.basedir.join("HEAD").is_file() {
        warn!(basedir = %config.basedir.display(), "Discarding unreadable local repository copy");
        fs::remove_dir_all(&config.basedir).map_err(|e| {
            ConfigError::unavailable(format!(
                "failed to reset {}: {}",
                config.basedir.display(),
                e
            ))
        })?;
    } else if config.basedir.exists() && !is_empty_dir(&config.basedir) {
        // Never delete a directory this backend did not create.
        return Err(ConfigError::unavailable(format!(
            "{} exists and is not a bare repository",
            config.basedir.display()
        )));
    }

    debug!(basedir = %config.basedir.display(), uri = %config.uri, "Initializing local repository copy");
    fs::create_dir_all(&config.basedir).map_err(|e| {
        ConfigError::unavailable(format!(
            "failed to create {}: {}",
            config.basedir.display(),
            e
        ))
    })?;
    let repo =
        Repository::init_bare(&config.basedir).map_err(|e| unavailable(&config.uri, e))?;
    repo.remote(REMOTE_NAME, &config.uri)
        .map_err(|e| unavailable(&config.uri, e))?;
    Ok(repo)
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn open(basedir: &Path) -> ConfigResult<Repository> {
    Repository::open_bare(basedir).map_err(|e| {
        ConfigError::unavailable(format!(
            "local repository copy {} is not available: {}",
            basedir.display(),
            e.message()
        ))
    })
}

fn resolve_label<'r>(repo: &'r Repository, label: &str) -> ConfigResult<Commit<'r>> {
    let references = [
        format!("refs/remotes/{}/{}", REMOTE_NAME, label),
        format!("refs/tags/{}", label),
    ];
    for name in &references {
        if let Ok(commit) = repo
            .find_reference(name)
            .and_then(|reference| reference.peel_to_commit())
        {
            return Ok(commit);
        }
    }

    repo.revparse_single(label)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| ConfigError::unavailable(format!("label '{}' does not exist", label)))
}

fn read_documents(basedir: &Path, application: &str, label: &str) -> ConfigResult<FetchedDocuments> {
    let repo = open(basedir)?;
    let commit = resolve_label(&repo, label)?;
    let version = BackendVersion::new(commit.id().to_string());
    let tree = commit
        .tree()
        .map_err(|e| ConfigError::unavailable(format!("failed to read tree: {}", e.message())))?;

    let mut documents = Vec::new();
    for entry in tree.iter() {
        if entry.kind() != Some(ObjectType::Blob) {
            continue;
        }
        let Some(name) = entry.name() else {
            continue;
        };
        if !is_candidate(name, application) {
            continue;
        }
        let blob = repo.find_blob(entry.id()).map_err(|e| {
            ConfigError::unavailable(format!("failed to read {}: {}", name, e.message()))
        })?;
        documents.push(SourceDocument::new(name, blob.content().to_vec(), version.clone()));
    }

    if documents.is_empty() {
        info!(application, label, "No configuration documents found");
        return Err(ConfigError::DocumentNotFound {
            application: application.to_string(),
        });
    }

    debug!(
        application,
        label,
        count = documents.len(),
        version = %version,
        "Read configuration documents"
    );

    Ok(FetchedDocuments { documents, version })
}

fn unavailable(uri: &str, error: git2::Error) -> ConfigError {
    ConfigError::unavailable(format!("git repository {}: {}", uri, error.message()))
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
