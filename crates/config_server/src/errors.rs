//! Error handling and HTTP error conversion
//!
//! Domain errors from `config_core` are converted to HTTP responses with an
//! appropriate status code and a machine-readable error code. The conversion
//! happens at the HTTP boundary.
//!
//! | Domain error               | Status |
//! |----------------------------|--------|
//! | DocumentNotFound           | 404    |
//! | SourceUnavailable          | 500    |
//! | MalformedDocument          | 500    |
//! | PlaceholderResolutionError | 500    |
//! | InternalError              | 500    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use config_core::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, shape varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Axum response wrapper for domain errors
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<ConfigResponse>, ApiError> {
///     let bundle = state.service.resolve(&request).await?; // ConfigError -> ApiError
///     Ok(Json(ConfigResponse::from(bundle.as_ref())))
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError(ConfigError);

impl ApiError {
    pub fn new(error: ConfigError) -> Self {
        ApiError(error)
    }

    /// Create an internal server error
    pub fn internal(reason: impl Into<String>) -> Self {
        ApiError(ConfigError::Internal {
            reason: reason.into(),
        })
    }

    /// The wrapped domain error
    pub fn inner(&self) -> &ConfigError {
        &self.0
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = convert_error(&self.0);

        // Log error server-side
        log_error(&self.0, status);

        (status, Json(error_response)).into_response()
    }
}

/// Convert a domain error to an HTTP status code and error response
pub fn convert_error(error: &ConfigError) -> (StatusCode, ErrorResponse) {
    let (status, message, details) = match error {
        ConfigError::DocumentNotFound { application } => (
            StatusCode::NOT_FOUND,
            error.to_string(),
            Some(json!({ "application": application })),
        ),
        ConfigError::SourceUnavailable { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string(), None)
        }
        ConfigError::MalformedDocument {
            source_name,
            line,
            column,
            reason: _,
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error.to_string(),
            Some(json!({
                "source": source_name,
                "line": line,
                "column": column
            })),
        ),
        ConfigError::PlaceholderResolution {
            source_name,
            key,
            placeholder,
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error.to_string(),
            Some(json!({
                "source": source_name,
                "key": key,
                "placeholder": placeholder
            })),
        ),
        // Internal details stay in the server log.
        ConfigError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred".to_string(),
            None,
        ),
    };

    (
        status,
        ErrorResponse {
            error: ErrorDetails {
                code: error.kind().as_str().to_string(),
                message,
                details,
            },
        },
    )
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ConfigError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(code = %error.kind(), "API error: {} - {}", status, error);
    } else if status.is_client_error() {
        tracing::warn!(code = %error.kind(), "API error: {} - {}", status, error);
    } else {
        tracing::info!(code = %error.kind(), "API error: {} - {}", status, error);
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
