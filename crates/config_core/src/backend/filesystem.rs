//! Local directory backend.
//!
//! Documents are read from the top level of a root directory. When a
//! subdirectory named after the requested label exists it is searched
//! instead, so `root/v2/orders.yml` serves label `v2`.
//!
//! The version token is a SHA-256 over the name, size and modification time
//! of every supported file in the searched directory. It is computed from
//! metadata before any content is read.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{run_blocking, SourceBackend};
use crate::document::{is_candidate, BackendVersion, DocumentName, FetchedDocuments, SourceDocument};
use crate::errors::{ConfigError, ConfigResult};

/// Backend serving documents from a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory searched for `label`.
    pub fn search_dir(&self, label: &str) -> PathBuf {
        let label_path = Path::new(label);
        let is_plain = !label.is_empty()
            && label_path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if is_plain {
            let candidate = self.root.join(label_path);
            if candidate.is_dir() {
                return candidate;
            }
        }
        self.root.clone()
    }
}

#[async_trait]
impl SourceBackend for FilesystemBackend {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn fetch(&self, application: &str, label: &str) -> ConfigResult<FetchedDocuments> {
        let dir = self.search_dir(label);
        let application = application.to_string();
        run_blocking(move || read_documents(&dir, &application)).await
    }

    async fn version(&self, label: &str) -> ConfigResult<BackendVersion> {
        let dir = self.search_dir(label);
        run_blocking(move || {
            let entries = scan(&dir)?;
            Ok(version_of(&entries))
        })
        .await
    }

    async fn check_health(&self) -> ConfigResult<()> {
        let root = self.root.clone();
        run_blocking(move || scan(&root).map(|_| ())).await
    }
}

struct FileEntry {
    name: String,
    path: PathBuf,
    len: u64,
    modified_nanos: u128,
}

fn read_documents(dir: &Path, application: &str) -> ConfigResult<FetchedDocuments> {
    let entries = scan(dir)?;
    let version = version_of(&entries);

    let mut documents = Vec::new();
    for entry in entries.iter().filter(|e| is_candidate(&e.name, application)) {
        let content = fs::read(&entry.path).map_err(|e| {
            ConfigError::unavailable(format!("failed to read {}: {}", entry.path.display(), e))
        })?;
        documents.push(SourceDocument::new(entry.name.clone(), content, version.clone()));
    }

    if documents.is_empty() {
        info!(application, dir = %dir.display(), "No configuration documents found");
        return Err(ConfigError::DocumentNotFound {
            application: application.to_string(),
        });
    }

    debug!(
        application,
        dir = %dir.display(),
        count = documents.len(),
        version = %version,
        "Read configuration documents"
    );

    Ok(FetchedDocuments { documents, version })
}

/// Lists supported documents in `dir`, sorted by file name.
fn scan(dir: &Path) -> ConfigResult<Vec<FileEntry>> {
    if !dir.is_dir() {
        return Err(ConfigError::unavailable(format!(
            "configuration directory {} is not readable",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            ConfigError::unavailable(format!("failed to list {}: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if DocumentName::parse(name).is_none() {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| {
            ConfigError::unavailable(format!("failed to stat {}: {}", entry.path().display(), e))
        })?;
        let modified_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        entries.push(FileEntry {
            name: name.to_string(),
            path: entry.path().to_path_buf(),
            len: metadata.len(),
            modified_nanos,
        });
    }
    Ok(entries)
}

fn version_of(entries: &[FileEntry]) -> BackendVersion {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.len.to_be_bytes());
        hasher.update(entry.modified_nanos.to_be_bytes());
    }
    BackendVersion::new(hex::encode(hasher.finalize()))
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
