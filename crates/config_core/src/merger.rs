//! Merge engine.
//!
//! Turns the resolver's ordered documents into a [`ResolvedBundle`]: every
//! document is parsed, flattened and placeholder-substituted into one
//! [`PropertySource`], keeping resolver order so that earlier sources take
//! precedence.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bundle::{PropertySource, ResolvedBundle};
use crate::document::{BackendVersion, SourceDocument};
use crate::errors::{ConfigError, ConfigResult};
use crate::parsers::{parse_document, FlatProperties};
use crate::placeholders::{resolve_placeholders, PlaceholderError, VariableSource};
use crate::request::ConfigRequest;

/// Combines resolved documents into bundles.
#[derive(Clone)]
pub struct MergeEngine {
    variables: Arc<dyn VariableSource>,
}

impl MergeEngine {
    /// Creates an engine that resolves placeholders against `variables`.
    pub fn new(variables: Arc<dyn VariableSource>) -> Self {
        Self { variables }
    }

    /// Merges `documents`, which must already be in precedence order.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MalformedDocument` if a document cannot be parsed
    /// - `ConfigError::PlaceholderResolution` if a placeholder has neither a
    ///   variable nor a default
    pub fn merge(
        &self,
        request: &ConfigRequest,
        version: BackendVersion,
        documents: &[SourceDocument],
    ) -> ConfigResult<ResolvedBundle> {
        let mut property_sources = Vec::with_capacity(documents.len());
        for document in documents {
            let parsed = parse_document(document).inspect_err(|e| {
                warn!(document = document.name(), error = %e, "Failed to parse document");
            })?;
            let properties = self.substitute(document.name(), parsed)?;
            debug!(
                document = document.name(),
                properties = properties.len(),
                "Merged property source"
            );
            property_sources.push(PropertySource::new(document.name(), properties));
        }

        Ok(ResolvedBundle {
            application: request.application().to_string(),
            profiles: request.profiles().to_vec(),
            label: request.label().to_string(),
            version,
            property_sources,
        })
    }

    fn substitute(&self, source_name: &str, properties: FlatProperties) -> ConfigResult<FlatProperties> {
        properties
            .into_iter()
            .map(|(key, value)| {
                match resolve_placeholders(&value, self.variables.as_ref()) {
                    Ok(resolved) => Ok((key, resolved)),
                    Err(PlaceholderError::Unresolved { name }) => {
                        Err(ConfigError::PlaceholderResolution {
                            source_name: source_name.to_string(),
                            key,
                            placeholder: name,
                        })
                    }
                    Err(PlaceholderError::Unterminated) => Err(ConfigError::MalformedDocument {
                        source_name: source_name.to_string(),
                        line: 0,
                        column: 0,
                        reason: format!("unterminated placeholder in '{}'", key),
                    }),
                    Err(err @ PlaceholderError::TooDeep { .. }) => {
                        Err(ConfigError::MalformedDocument {
                            source_name: source_name.to_string(),
                            line: 0,
                            column: 0,
                            reason: format!("{} in '{}'", err, key),
                        })
                    }
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "merger_tests.rs"]
mod tests;
