// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for metrics module

use super::metrics::*;

#[test]
fn test_init_metrics() {
    init_metrics();
    let metrics = gather_metrics().unwrap();
    assert!(metrics.contains("dynzone_app_info"));
    assert!(metrics.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_record_http_request() {
    record_http_request("GET", "/", 200, 0.123);
    record_http_request("GET", "/", 401, 0.456);
    record_http_request("GET", "/metrics", 200, 0.001);

    let metrics = gather_metrics().unwrap();
    assert!(metrics.contains("dynzone_http_requests_total"));
    assert!(metrics.contains("dynzone_http_request_duration_seconds"));
}

#[test]
fn test_record_update() {
    for result in ["ok", "unauthorized", "bad_request", "write_error"] {
        record_update(result);
    }

    let metrics = gather_metrics().unwrap();
    assert!(metrics.contains("dynzone_update_requests_total"));
    assert!(metrics.contains("unauthorized"));
    assert!(metrics.contains("bad_request"));
}

#[test]
fn test_record_update_increments() {
    let before = UPDATE_REQUESTS_TOTAL.with_label_values(&["ok"]).get();
    record_update("ok");
    let after = UPDATE_REQUESTS_TOTAL.with_label_values(&["ok"]).get();
    assert!(after >= before + 1.0);
}

#[test]
fn test_record_zone_write() {
    record_zone_write(true);
    record_zone_write(false);

    let metrics = gather_metrics().unwrap();
    assert!(metrics.contains("dynzone_zone_writes_total"));
    assert!(metrics.contains("success"));
    assert!(metrics.contains("error"));
}
