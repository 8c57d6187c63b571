//! Request tracing middleware
//!
//! Every request gets a request ID (UUID v4). The ID is stored in the request
//! extensions for handlers, logged at start and completion, and returned to
//! the client in the `x-request-id` response header.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Header carrying the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID attached to request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Request tracing middleware.
///
/// Adds a request ID and logging context for observability.
pub async fn tracing_middleware(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Request started"
    );

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        status = %response.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
