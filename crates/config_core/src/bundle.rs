//! Resolved configuration bundles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::BackendVersion;

/// One parsed document with its flattened properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySource {
    /// Origin of the properties, i.e. the document name.
    pub name: String,

    /// Flattened properties, sorted by key.
    pub properties: BTreeMap<String, String>,
}

impl PropertySource {
    pub fn new(name: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

/// The merged configuration served for one request.
///
/// Property sources are ordered by precedence: on key collisions the earlier
/// source wins. A bundle is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBundle {
    pub application: String,
    pub profiles: Vec<String>,
    pub label: String,
    pub version: BackendVersion,
    pub property_sources: Vec<PropertySource>,
}

impl ResolvedBundle {
    /// Names of the contributing sources, highest precedence first.
    pub fn source_names(&self) -> Vec<&str> {
        self.property_sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Flattened view where the first source defining a key wins.
    pub fn effective_properties(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for source in &self.property_sources {
            for (key, value) in &source.properties {
                merged
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        merged
    }

    /// Effective value of a single property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.property_sources
            .iter()
            .find_map(|source| source.properties.get(key))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.property_sources.is_empty()
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
