//! Tests for document resolution.

use super::*;
use crate::document::BackendVersion;

fn docs(names: &[&str]) -> Vec<SourceDocument> {
    names
        .iter()
        .map(|name| SourceDocument::new(*name, Vec::new(), BackendVersion::new("v1")))
        .collect()
}

fn names(resolved: &[SourceDocument]) -> Vec<&str> {
    resolved.iter().map(SourceDocument::name).collect()
}

#[test]
fn candidate_names_most_specific_first() {
    let request = ConfigRequest::new("orders", "dev", "main");
    assert_eq!(
        candidate_names(&request),
        vec!["orders-dev", "orders", "application-dev", "application"]
    );
}

#[test]
fn candidate_names_for_multiple_profiles_keep_leftmost_first() {
    let request = ConfigRequest::new("orders", "dev,cloud", "main");
    assert_eq!(
        candidate_names(&request),
        vec![
            "orders-dev",
            "orders-cloud",
            "orders",
            "application-dev",
            "application-cloud",
            "application"
        ]
    );
}

#[test]
fn candidate_names_deduplicate_global_application() {
    let request = ConfigRequest::new("application", "dev", "main");
    assert_eq!(candidate_names(&request), vec!["application-dev", "application"]);
}

#[test]
fn resolve_orders_documents_by_precedence() {
    let request = ConfigRequest::new("orders", "dev", "main");
    let available = docs(&[
        "application.yml",
        "orders.yml",
        "application-dev.yml",
        "orders-dev.yml",
        "billing.yml",
    ]);

    let resolved = resolve(&request, &available);
    assert_eq!(
        names(&resolved),
        vec!["orders-dev.yml", "orders.yml", "application-dev.yml", "application.yml"]
    );
}

#[test]
fn resolve_skips_missing_profile_documents() {
    let request = ConfigRequest::new("orders", "prod", "main");
    let available = docs(&["orders-dev.yml", "orders.yml", "application.yml"]);

    let resolved = resolve(&request, &available);
    assert_eq!(names(&resolved), vec!["orders.yml", "application.yml"]);
}

#[test]
fn resolve_orders_extensions_within_base_name() {
    let request = ConfigRequest::new("orders", "default", "main");
    let available = docs(&["orders.json", "orders.yaml", "orders.properties", "orders.yml"]);

    let resolved = resolve(&request, &available);
    assert_eq!(
        names(&resolved),
        vec!["orders.properties", "orders.yml", "orders.yaml", "orders.json"]
    );
}

#[test]
fn resolve_returns_empty_when_nothing_matches() {
    let request = ConfigRequest::new("orders", "dev", "main");
    let available = docs(&["billing.yml", "application-prod.yml"]);

    assert!(resolve(&request, &available).is_empty());
}
