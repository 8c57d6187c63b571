//! HTTP response type definitions
//!
//! HTTP response types:
//! - Convert from domain types via `From` trait
//! - Use camelCase for JSON serialization

use std::collections::BTreeMap;

use config_core::ResolvedBundle;
use serde::{Deserialize, Serialize};

/// HTTP response for a resolved configuration bundle.
///
/// `propertySources` lists every contributing document, highest precedence
/// first; `properties` is the effective view where the first source defining
/// a key wins.
///
/// # Example
///
/// ```json
/// {
///   "name": "orders",
///   "profiles": ["dev"],
///   "label": "main",
///   "version": "3f2c1e0",
///   "sources": ["orders-dev.yml", "application.yml"],
///   "properties": { "server.port": "8081" },
///   "propertySources": [
///     { "name": "orders-dev.yml", "source": { "server.port": "8081" } },
///     { "name": "application.yml", "source": { "server.port": "8080" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    /// Application name
    pub name: String,

    /// Active profiles, highest precedence first
    pub profiles: Vec<String>,

    pub label: String,

    /// Backend version the bundle was built from
    pub version: String,

    /// Names of the contributing documents, highest precedence first
    pub sources: Vec<String>,

    /// Effective properties
    pub properties: BTreeMap<String, String>,

    pub property_sources: Vec<PropertySourceResponse>,
}

/// One contributing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySourceResponse {
    pub name: String,
    pub source: BTreeMap<String, String>,
}

impl From<&ResolvedBundle> for ConfigResponse {
    fn from(bundle: &ResolvedBundle) -> Self {
        Self {
            name: bundle.application.clone(),
            profiles: bundle.profiles.clone(),
            label: bundle.label.clone(),
            version: bundle.version.to_string(),
            sources: bundle
                .source_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            properties: bundle.effective_properties(),
            property_sources: bundle
                .property_sources
                .iter()
                .map(|source| PropertySourceResponse {
                    name: source.name.clone(),
                    source: source.properties.clone(),
                })
                .collect(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "UP" or "DOWN"
    pub status: String,

    /// Backend kind, e.g. `git`
    pub backend: String,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,

    /// Error message (if down)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn up(backend: impl Into<String>) -> Self {
        Self {
            status: "UP".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: None,
        }
    }

    pub fn down(backend: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: "DOWN".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
