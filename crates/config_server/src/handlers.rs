//! HTTP request handlers
//!
//! Handlers translate path parameters into a `ConfigRequest`, call the
//! configuration service and map the result to an HTTP response.
//!
//! Labels containing `/` are sent with `(_)` in its place, for example
//! `release(_)2024` for the branch `release/2024`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    errors::ApiError,
    models::response::{ConfigResponse, HealthResponse},
    AppState,
};

/// GET /:application/:profile
///
/// Returns the bundle for the default label.
pub async fn get_config(
    State(state): State<AppState>,
    Path((application, profile)): Path<(String, String)>,
) -> Result<Json<ConfigResponse>, ApiError> {
    resolve(&state, &application, &profile, None).await
}

/// GET /:application/:profile/:label
pub async fn get_config_with_label(
    State(state): State<AppState>,
    Path((application, profile, label)): Path<(String, String, String)>,
) -> Result<Json<ConfigResponse>, ApiError> {
    resolve(&state, &application, &profile, Some(&label)).await
}

async fn resolve(
    state: &AppState,
    application: &str,
    profile: &str,
    label: Option<&str>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let request = state.service.request(application, profile, label);
    let bundle = state.service.resolve(&request).await?;

    tracing::debug!(
        application = %request.application(),
        profiles = %request.profile_string(),
        label = %request.label(),
        version = %bundle.version,
        sources = bundle.property_sources.len(),
        "Serving configuration"
    );

    Ok(Json(ConfigResponse::from(bundle.as_ref())))
}

/// GET /health
///
/// Returns 200 when the backend is reachable, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let backend = state.service.backend_name().to_string();
    match state.service.check_health().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::up(backend))).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::down(backend, e.to_string())),
        )
            .into_response(),
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
