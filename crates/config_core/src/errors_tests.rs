//! Tests for configuration error types.

use super::*;

#[test]
fn kind_maps_every_variant() {
    let cases = vec![
        (ConfigError::unavailable("down"), "SourceUnavailable"),
        (
            ConfigError::DocumentNotFound {
                application: "orders".to_string(),
            },
            "DocumentNotFound",
        ),
        (
            ConfigError::MalformedDocument {
                source_name: "orders.yml".to_string(),
                line: 3,
                column: 1,
                reason: "bad indent".to_string(),
            },
            "MalformedDocument",
        ),
        (
            ConfigError::PlaceholderResolution {
                source_name: "orders.yml".to_string(),
                key: "db.url".to_string(),
                placeholder: "DB_URL".to_string(),
            },
            "PlaceholderResolutionError",
        ),
        (
            ConfigError::Internal {
                reason: "panic".to_string(),
            },
            "InternalError",
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error.kind().as_str(), expected);
        assert_eq!(error.kind().to_string(), expected);
    }
}

#[test]
fn only_source_unavailable_is_retryable() {
    assert!(ConfigError::unavailable("timeout").is_retryable());
    assert!(!ConfigError::DocumentNotFound {
        application: "a".to_string()
    }
    .is_retryable());
}

#[test]
fn malformed_document_message_names_source_and_position() {
    let error = ConfigError::MalformedDocument {
        source_name: "billing-dev.yml".to_string(),
        line: 7,
        column: 4,
        reason: "mapping values are not allowed here".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("billing-dev.yml"));
    assert!(message.contains("line 7"));
    assert!(message.contains("column 4"));
}

#[test]
fn placeholder_message_names_key() {
    let error = ConfigError::PlaceholderResolution {
        source_name: "application.yml".to_string(),
        key: "db.password".to_string(),
        placeholder: "DB_PASSWORD".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("db.password"));
    assert!(message.contains("DB_PASSWORD"));
}
