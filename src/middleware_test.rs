// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for middleware module

use super::middleware::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower::ServiceExt;

async fn test_handler() -> impl IntoResponse {
    (StatusCode::OK, "success")
}

async fn test_handler_unauthorized() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, "user or password wrong\n")
}

#[tokio::test]
async fn test_track_metrics_success() {
    let app = Router::new()
        .route("/test", get(test_handler))
        .layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .uri("/test")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics_output = crate::metrics::gather_metrics().unwrap();
    assert!(metrics_output.contains("dynzone_http_requests_total"));
    assert!(metrics_output.contains("dynzone_http_request_duration_seconds"));
}

#[tokio::test]
async fn test_track_metrics_error_response() {
    let app = Router::new()
        .route("/denied", get(test_handler_unauthorized))
        .layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .uri("/denied")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let count = crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/denied", "401"])
        .get();
    assert!(count >= 1.0);
}

#[tokio::test]
async fn test_track_metrics_omits_query_string() {
    let app = Router::new()
        .route("/", get(test_handler))
        .layer(middleware::from_fn(track_metrics));

    let request = Request::builder()
        .uri("/?user=baz&passwd=super-secret-value")
        .body(Body::empty())
        .unwrap();

    let _ = app.oneshot(request).await.unwrap();

    let metrics_output = crate::metrics::gather_metrics().unwrap();
    assert!(!metrics_output.contains("super-secret-value"));
}

#[tokio::test]
async fn test_track_metrics_unknown_paths_share_one_series() {
    let app = Router::new()
        .route("/test", get(test_handler))
        .layer(middleware::from_fn(track_metrics));

    let before = crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", UNMATCHED_PATH, "404"])
        .get();

    for uri in ["/scan-wp-login.php", "/scan-admin/.env"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let after = crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", UNMATCHED_PATH, "404"])
        .get();
    assert!(after - before >= 2.0);

    let metrics_output = crate::metrics::gather_metrics().unwrap();
    assert!(!metrics_output.contains("scan-wp-login"));
    assert!(!metrics_output.contains("scan-admin"));
}
