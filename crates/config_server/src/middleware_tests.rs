//! Tests for middleware module

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use tower::ServiceExt; // for `oneshot`

/// Test helper: echoes the request ID seen by the handler
async fn echo_request_id(Extension(RequestId(id)): Extension<RequestId>) -> String {
    id
}

#[tokio::test]
async fn test_tracing_middleware_sets_request_id_header() {
    let app = Router::new()
        .route("/test", get(echo_request_id))
        .layer(middleware::from_fn(tracing_middleware));

    let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .expect("Should have request id header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&header).is_ok());

    // The handler saw the same ID the client received
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(body.to_vec()).unwrap(), header);
}

#[tokio::test]
async fn test_tracing_middleware_assigns_distinct_ids() {
    let app = Router::new()
        .route("/test", get(echo_request_id))
        .layer(middleware::from_fn(tracing_middleware));

    let mut ids = Vec::new();
    for _ in 0..2 {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        ids.push(response.headers()[REQUEST_ID_HEADER].clone());
    }

    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_tracing_middleware_keeps_error_status() {
    let app = Router::new()
        .route("/test", get(|| async { StatusCode::NOT_FOUND }))
        .layer(middleware::from_fn(tracing_middleware));

    let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}
