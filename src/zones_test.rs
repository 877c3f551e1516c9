// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for zones module

use super::zones::*;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

fn ipv4() -> Ipv4Addr {
    "192.168.178.2".parse().unwrap()
}

fn ipv6() -> Ipv6Addr {
    "2001:db8::68".parse().unwrap()
}

fn record(ttl: u32, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> SubdomainRecord {
    SubdomainRecord {
        name_part: "foobar".to_string(),
        ttl,
        ipv4,
        ipv6,
    }
}

#[test]
fn test_render_ipv4_only() {
    let fragment = render(&record(60, Some(ipv4()), None));
    assert_eq!(
        fragment,
        "{DEFAULT}\nfoobar.{DOM_HOSTNAME}. 60 IN A 192.168.178.2\n"
    );
    assert_eq!(fragment.matches(" IN A ").count(), 1);
    assert_eq!(fragment.matches(" IN AAAA ").count(), 0);
}

#[test]
fn test_render_ipv6_only() {
    let fragment = render(&record(60, None, Some(ipv6())));
    assert_eq!(
        fragment,
        "{DEFAULT}\n\nfoobar.{DOM_HOSTNAME}. 60 IN AAAA 2001:db8::68"
    );
}

#[test]
fn test_render_both_families_a_before_aaaa() {
    let fragment = render(&record(60, Some(ipv4()), Some(ipv6())));
    assert_eq!(
        fragment,
        "{DEFAULT}\nfoobar.{DOM_HOSTNAME}. 60 IN A 192.168.178.2\nfoobar.{DOM_HOSTNAME}. 60 IN AAAA 2001:db8::68"
    );

    let a = fragment.find(" IN A ").unwrap();
    let aaaa = fragment.find(" IN AAAA ").unwrap();
    assert!(a < aaaa);
}

#[test]
fn test_render_uses_ttl() {
    let fragment = render(&record(120, Some(ipv4()), Some(ipv6())));
    assert!(fragment.contains("foobar.{DOM_HOSTNAME}. 120 IN A 192.168.178.2"));
    assert!(fragment.contains("foobar.{DOM_HOSTNAME}. 120 IN AAAA 2001:db8::68"));
}

#[test]
fn test_render_no_addresses() {
    let fragment = render(&record(60, None, None));
    assert_eq!(fragment, "{DEFAULT}\n\n");
    assert!(!fragment.contains(" IN "));
}

#[test]
fn test_render_is_idempotent() {
    let r = record(60, Some(ipv4()), Some(ipv6()));
    assert_eq!(render(&r), render(&r));
}

#[test]
fn test_render_custom_placeholder() {
    let fragment = record(60, Some(ipv4()), None).to_zone_fragment("dyn.example.com");
    assert!(fragment.contains("foobar.dyn.example.com. 60 IN A 192.168.178.2"));
}

#[test]
fn test_subdomain_record_new() {
    let r = SubdomainRecord::new("home");
    assert_eq!(r.name_part, "home");
    assert_eq!(r.ttl, DEFAULT_TTL);
    assert!(r.ipv4.is_none());
    assert!(r.ipv6.is_none());
}

#[tokio::test]
async fn test_zone_file_set_and_current_record() {
    let zone = ZoneFile::new(
        "/nonexistent/zone",
        DEFAULT_HOSTNAME_PLACEHOLDER,
        SubdomainRecord::new("foobar"),
    );

    let r = record(60, Some(ipv4()), None);
    zone.set(r.clone()).await;
    assert_eq!(zone.current_record().await, r);
}

#[tokio::test]
async fn test_zone_file_update_writes_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dyndns.zone");

    let zone = ZoneFile::new(
        &path,
        DEFAULT_HOSTNAME_PLACEHOLDER,
        SubdomainRecord::new("foobar"),
    );

    let r = record(60, Some(ipv4()), Some(ipv6()));
    zone.update(r.clone()).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render(&r));
    assert_eq!(zone.current_record().await, r);
}

#[tokio::test]
async fn test_zone_file_update_truncates_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dyndns.zone");
    std::fs::write(&path, "x".repeat(4096)).unwrap();

    let zone = ZoneFile::new(
        &path,
        DEFAULT_HOSTNAME_PLACEHOLDER,
        SubdomainRecord::new("foobar"),
    );

    zone.update(record(60, None, None)).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{DEFAULT}\n\n");
}

#[tokio::test]
async fn test_zone_file_update_write_failure_keeps_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("dyndns.zone");

    let zone = ZoneFile::new(
        &path,
        DEFAULT_HOSTNAME_PLACEHOLDER,
        SubdomainRecord::new("foobar"),
    );

    let r = record(60, Some(ipv4()), None);
    let result = zone.update(r.clone()).await;

    assert!(matches!(result, Err(ZoneError::Write { .. })));
    assert_eq!(zone.current_record().await, r);
}

#[tokio::test]
async fn test_zone_file_concurrent_updates_file_matches_a_final_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dyndns.zone");

    let zone = Arc::new(ZoneFile::new(
        &path,
        DEFAULT_HOSTNAME_PLACEHOLDER,
        SubdomainRecord::new("foobar"),
    ));

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let zone = Arc::clone(&zone);
        handles.push(tokio::spawn(async move {
            let r = record(60, Some(Ipv4Addr::new(10, 0, 0, i)), None);
            zone.update(r).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // whichever update won, file and state agree
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, zone.render(&zone.current_record().await));
}

#[tokio::test]
async fn test_write_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dyndns.zone");
    let r = record(60, None, Some(ipv6()));

    write(&path, &r).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), render(&r));
}

#[test]
fn test_zone_error_display() {
    let error = ZoneError::Write {
        path: "/var/lib/dns/dyn.zone".into(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    let message = error.to_string();
    assert!(message.contains("/var/lib/dns/dyn.zone"));
    assert!(message.contains("denied"));
}
