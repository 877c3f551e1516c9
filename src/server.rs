// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP router
//!
//! Routes:
//! - `GET /` update endpoint
//! - `GET /test` liveness probe
//! - `GET /health` health check
//! - `GET /metrics` Prometheus scrape endpoint

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::{metrics, middleware, types::AppState, updater};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Liveness probe
async fn hello() -> &'static str {
    "Hello World\n"
}

/// Metrics endpoint for Prometheus scraping
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to gather metrics: {}\n", e),
        )
            .into_response(),
    }
}

/// Build the application router
///
/// `access_log` adds a request trace layer.
pub fn router(state: AppState, access_log: bool) -> Router {
    let app = Router::new()
        .route("/", get(updater::update))
        .route("/test", get(hello))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::track_metrics));

    if access_log {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}
