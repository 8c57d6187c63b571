//! Document resolution.
//!
//! Decides which of the fetched documents apply to a request and in which
//! order. For profiles `p1..pn` the candidate base names are, most specific
//! first:
//!
//! 1. `{application}-{p1}` … `{application}-{pn}`
//! 2. `{application}`
//! 3. `application-{p1}` … `application-{pn}`
//! 4. `application`
//!
//! Documents sharing a base name are ordered by extension
//! (`properties`, `yml`, `yaml`, `json`).

use crate::document::{DocumentName, SourceDocument, GLOBAL_APPLICATION};
use crate::request::ConfigRequest;

/// Candidate base names for `request`, highest precedence first.
pub fn candidate_names(request: &ConfigRequest) -> Vec<String> {
    let mut names = Vec::new();
    for application in [request.application(), GLOBAL_APPLICATION] {
        for profile in request.profiles() {
            push_unique(&mut names, format!("{application}-{profile}"));
        }
        push_unique(&mut names, application.to_string());
    }
    names
}

/// Selects and orders the documents that contribute to `request`.
///
/// Missing profile documents are skipped silently; the result may be empty.
pub fn resolve(request: &ConfigRequest, documents: &[SourceDocument]) -> Vec<SourceDocument> {
    let mut resolved = Vec::new();
    for base in candidate_names(request) {
        let mut matching: Vec<(usize, &SourceDocument)> = documents
            .iter()
            .filter_map(|doc| {
                DocumentName::parse(doc.name())
                    .filter(|name| name.base == base)
                    .map(|name| (name.extension_rank(), doc))
            })
            .collect();
        matching.sort_by_key(|(rank, _)| *rank);
        resolved.extend(matching.into_iter().map(|(_, doc)| doc.clone()));
    }

    tracing::debug!(
        application = request.application(),
        profiles = %request.profile_string(),
        resolved = ?resolved.iter().map(SourceDocument::name).collect::<Vec<_>>(),
        "Resolved candidate documents"
    );

    resolved
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
