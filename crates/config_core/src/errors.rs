//! Configuration service error types.
//!
//! Domain-specific errors raised while fetching, resolving, parsing and
//! merging configuration documents.

use std::fmt;

use thiserror::Error;

/// Errors produced by the configuration pipeline.
///
/// Errors are `Clone` so that a single failed compute can be handed to every
/// request waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("No configuration documents found for application '{application}'")]
    DocumentNotFound { application: String },

    #[error("Malformed document '{source_name}' at line {line}, column {column}: {reason}")]
    MalformedDocument {
        source_name: String,
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("Could not resolve placeholder '{placeholder}' in '{key}' of '{source_name}'")]
    PlaceholderResolution {
        source_name: String,
        key: String,
        placeholder: String,
    },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl ConfigError {
    /// Shorthand for a `SourceUnavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::DocumentNotFound { .. } => ErrorKind::DocumentNotFound,
            Self::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Self::PlaceholderResolution { .. } => ErrorKind::PlaceholderResolution,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}

/// Coarse classification of [`ConfigError`] used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    DocumentNotFound,
    MalformedDocument,
    PlaceholderResolution,
    Internal,
}

impl ErrorKind {
    /// Stable name reported to clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceUnavailable => "SourceUnavailable",
            Self::DocumentNotFound => "DocumentNotFound",
            Self::MalformedDocument => "MalformedDocument",
            Self::PlaceholderResolution => "PlaceholderResolutionError",
            Self::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
