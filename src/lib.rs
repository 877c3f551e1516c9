// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! dynzone - dynamic DNS updates written to a zone file fragment
//!
//! A small HTTP service that accepts dyndns-style update requests from a
//! router or script, authenticates them against a single pre-shared
//! username/password (Argon2id), and rewrites a zone file fragment holding
//! the current A/AAAA records of one subdomain. The fragment is meant to be
//! included into a larger zone file served by an external DNS server.
//!
//! # Features
//!
//! - Constant-time username and Argon2id password verification
//! - Strict IPv4/IPv6 parameter validation
//! - Deterministic zone fragment rendering, serialized file writes
//! - Prometheus metrics and structured logging
//!
//! # Usage
//!
//! ## As a Library
//!
//! ```rust
//! use dynzone::SubdomainRecord;
//!
//! let record = SubdomainRecord {
//!     name_part: "home".to_string(),
//!     ttl: 60,
//!     ipv4: Some("192.0.2.10".parse().unwrap()),
//!     ipv6: None,
//! };
//!
//! let fragment = record.to_zone_fragment("{DOM_HOSTNAME}");
//! assert!(fragment.contains("home.{DOM_HOSTNAME}. 60 IN A 192.0.2.10"));
//! ```
//!
//! ## As a Binary
//!
//! ```bash
//! dynzone generate-password > credential.txt
//! dynzone validate-config --config /etc/dynzone.yaml
//! dynzone serve --config /etc/dynzone.yaml
//! ```
//!
//! A client then updates the record with
//! `GET /?user=<user>&passwd=<password>&ipaddr=<ipv4>&ip6addr=<ipv6>`.

pub mod auth;
pub mod config;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod types;
pub mod updater;
pub mod zones;

// Credential validation
pub use auth::{Argon2Validator, Credential, PasswordValidator};

// Configuration
pub use config::{Config, ConfigError};

// Shared state and errors
pub use types::{AppState, UpdateError, UpdateParams};

// Zone state and rendering
pub use zones::{SubdomainRecord, ZoneError, ZoneFile};

#[cfg(test)]
mod metrics_test;
#[cfg(test)]
mod middleware_test;
#[cfg(test)]
mod zones_test;
