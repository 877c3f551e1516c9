// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for dynzone
//!
//! - HTTP request metrics (count, duration, status codes)
//! - Update request outcomes (ok, unauthorized, bad request, write errors)
//! - Zone file writes

use lazy_static::lazy_static;
use prometheus::{
    opts, register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec,
    TextEncoder,
};

lazy_static! {
    /// HTTP request counter by method, path, and status code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "dynzone_http_requests_total",
            "Total number of HTTP requests processed"
        ),
        &["method", "path", "status"]
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration histogram
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "dynzone_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Update requests by pipeline outcome
    pub static ref UPDATE_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "dynzone_update_requests_total",
            "Total number of update requests by result"
        ),
        &["result"]
    )
    .expect("Failed to create UPDATE_REQUESTS_TOTAL metric");

    /// Zone file writes by result
    pub static ref ZONE_WRITES_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "dynzone_zone_writes_total",
            "Total number of zone file writes"
        ),
        &["result"]
    )
    .expect("Failed to create ZONE_WRITES_TOTAL metric");

    /// Application info metric
    pub static ref APP_INFO: CounterVec = register_counter_vec!(
        opts!(
            "dynzone_app_info",
            "Application information"
        ),
        &["version"]
    )
    .expect("Failed to create APP_INFO metric");
}

/// Initialize metrics with application info
pub fn init_metrics() {
    APP_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .inc();
}

/// Generate metrics output in Prometheus format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record the outcome of an update request
pub fn record_update(result: &str) {
    UPDATE_REQUESTS_TOTAL.with_label_values(&[result]).inc();
}

/// Record a zone file write
pub fn record_zone_write(success: bool) {
    let result = if success { "success" } else { "error" };
    ZONE_WRITES_TOTAL.with_label_values(&[result]).inc();
}
