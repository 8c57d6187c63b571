//! HTTP routing configuration
//!
//! # Route Structure
//!
//! - GET /health - Backend health check
//! - GET /:application/:profile - Bundle at the default label
//! - GET /:application/:profile/:label - Bundle at the given label
//!
//! There are no mutation endpoints.

use axum::{middleware, routing::get, Router};
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{handlers, middleware as api_middleware, AppState};

/// Create the complete router with all routes configured.
///
/// This function sets up:
/// - All endpoint routes
/// - Request tracing
/// - Timeout handling
pub fn create_router(state: AppState) -> Router {
    // Configure request tracing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    let timeout_layer = TimeoutLayer::new(state.request_timeout);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/:application/:profile", get(handlers::get_config))
        .route(
            "/:application/:profile/:label",
            get(handlers::get_config_with_label),
        )
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(timeout_layer)
        .layer(trace_layer)
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
