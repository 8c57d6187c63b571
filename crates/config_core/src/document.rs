//! Raw configuration documents and backend version tokens.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Base name of the documents shared by every application.
pub const GLOBAL_APPLICATION: &str = "application";

/// Opaque token identifying the state of a backing store.
///
/// Two equal versions guarantee identical document content for the same
/// application and label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendVersion(String);

impl BackendVersion {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported document formats, in precedence order for a shared base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentFormat {
    Properties,
    Yaml,
    Json,
}

impl DocumentFormat {
    /// File extensions understood by the server, highest precedence first.
    pub const EXTENSIONS: [&'static str; 4] = ["properties", "yml", "yaml", "json"];

    /// Determines the format from a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "properties" => Some(Self::Properties),
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A file name split into its base name and a supported extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentName<'a> {
    pub base: &'a str,
    pub extension: &'a str,
}

impl<'a> DocumentName<'a> {
    /// Splits `file_name`, returning `None` for unsupported extensions.
    pub fn parse(file_name: &'a str) -> Option<Self> {
        let (base, extension) = file_name.rsplit_once('.')?;
        if base.is_empty() || DocumentFormat::from_extension(extension).is_none() {
            return None;
        }
        Some(Self { base, extension })
    }

    /// Rank of the extension among [`DocumentFormat::EXTENSIONS`].
    pub fn extension_rank(&self) -> usize {
        DocumentFormat::EXTENSIONS
            .iter()
            .position(|ext| *ext == self.extension)
            .unwrap_or(DocumentFormat::EXTENSIONS.len())
    }
}

/// Whether `file_name` could contribute to the configuration of `application`.
///
/// Matches `{application}[-{profile}].{ext}` and the global
/// `application[-{profile}].{ext}` documents.
pub fn is_candidate(file_name: &str, application: &str) -> bool {
    DocumentName::parse(file_name).is_some_and(|name| {
        has_base_prefix(name.base, application) || has_base_prefix(name.base, GLOBAL_APPLICATION)
    })
}

/// Whether `file_name` belongs to `application` itself rather than the
/// global defaults.
pub fn is_application_specific(file_name: &str, application: &str) -> bool {
    application != GLOBAL_APPLICATION
        && DocumentName::parse(file_name).is_some_and(|name| has_base_prefix(name.base, application))
}

fn has_base_prefix(base: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    base == prefix
        || base
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|profile| !profile.is_empty())
}

/// One configuration file retrieved from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: String,
    content: Arc<[u8]>,
    version: BackendVersion,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>, version: BackendVersion) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
            version,
        }
    }

    /// File name, e.g. `orders-dev.yml`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn version(&self) -> &BackendVersion {
        &self.version
    }

    /// Format implied by the file extension.
    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentName::parse(&self.name)
            .and_then(|name| DocumentFormat::from_extension(name.extension))
    }
}

/// Documents returned by a single backend fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocuments {
    pub documents: Vec<SourceDocument>,
    pub version: BackendVersion,
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
