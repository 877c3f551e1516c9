// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone state and zone fragment rendering
//!
//! This module holds the one subdomain record the service manages and turns
//! it into the zone file fragment consumed by the DNS server:
//! - Rendering the record through the fixed fragment template
//! - Writing the fragment to the configured path (create + truncate)
//! - Serializing set + render + write so concurrent updates cannot interleave

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::metrics;

/// Marker the surrounding zone file replaces with its default records
pub const DEFAULT_MARKER: &str = "{DEFAULT}";

/// Placeholder for the zone's hostname, substituted by the surrounding zone file
pub const DEFAULT_HOSTNAME_PLACEHOLDER: &str = "{DOM_HOSTNAME}";

/// TTL of the rendered records in seconds
pub const DEFAULT_TTL: u32 = 60;

/// Zone fragment errors
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("cannot write zone file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Address records of the managed subdomain
///
/// Holds at most one address per family. An update replaces both families,
/// so a family missing from the update request is cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainRecord {
    /// Subdomain label (e.g. "home" for home.dyn.example.com)
    pub name_part: String,

    /// TTL in seconds
    pub ttl: u32,

    pub ipv4: Option<Ipv4Addr>,

    pub ipv6: Option<Ipv6Addr>,
}

impl SubdomainRecord {
    /// Record with no addresses and the default TTL
    pub fn new(name_part: impl Into<String>) -> Self {
        Self {
            name_part: name_part.into(),
            ttl: DEFAULT_TTL,
            ipv4: None,
            ipv6: None,
        }
    }

    /// Render the zone file fragment for this record
    ///
    /// The layout is fixed: the `{DEFAULT}` marker, then the A line (or an
    /// empty line), then the AAAA line (or nothing). The output depends only
    /// on the record and the placeholder.
    pub fn to_zone_fragment(&self, hostname_placeholder: &str) -> String {
        let mut fragment = String::from(DEFAULT_MARKER);

        fragment.push('\n');
        if let Some(ipv4) = self.ipv4 {
            fragment.push_str(&format!(
                "{}.{}. {} IN A {}",
                self.name_part, hostname_placeholder, self.ttl, ipv4
            ));
        }

        fragment.push('\n');
        if let Some(ipv6) = self.ipv6 {
            fragment.push_str(&format!(
                "{}.{}. {} IN AAAA {}",
                self.name_part, hostname_placeholder, self.ttl, ipv6
            ));
        }

        fragment
    }
}

/// Render `record` using the default hostname placeholder
pub fn render(record: &SubdomainRecord) -> String {
    record.to_zone_fragment(DEFAULT_HOSTNAME_PLACEHOLDER)
}

/// Write `contents` to `path`, creating the file if needed and replacing
/// whatever it held before.
pub async fn write_fragment(path: &Path, contents: &str) -> Result<(), ZoneError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ZoneError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Render `record` with the default placeholder and write it to `path`
pub async fn write(path: &Path, record: &SubdomainRecord) -> Result<(), ZoneError> {
    write_fragment(path, &render(record)).await
}

/// The managed zone fragment: current record plus its on-disk location
///
/// The record lives behind an async mutex that stays locked for the whole
/// set + render + write sequence, so at most one write is in flight and the
/// file always reflects the last update that acquired the lock.
#[derive(Debug)]
pub struct ZoneFile {
    path: PathBuf,
    hostname_placeholder: String,
    record: Mutex<SubdomainRecord>,
}

impl ZoneFile {
    pub fn new(
        path: impl Into<PathBuf>,
        hostname_placeholder: impl Into<String>,
        record: SubdomainRecord,
    ) -> Self {
        Self {
            path: path.into(),
            hostname_placeholder: hostname_placeholder.into(),
            record: Mutex::new(record),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hostname_placeholder(&self) -> &str {
        &self.hostname_placeholder
    }

    /// Replace the held record without touching the file
    pub async fn set(&self, record: SubdomainRecord) {
        *self.record.lock().await = record;
    }

    /// Snapshot of the held record
    pub async fn current_record(&self) -> SubdomainRecord {
        self.record.lock().await.clone()
    }

    /// Render `record` with this zone's hostname placeholder
    pub fn render(&self, record: &SubdomainRecord) -> String {
        record.to_zone_fragment(&self.hostname_placeholder)
    }

    /// Replace the record and persist the rendered fragment
    ///
    /// A failed write does not restore the previous record; the next
    /// successful update rewrites the whole fragment anyway.
    pub async fn update(&self, record: SubdomainRecord) -> Result<(), ZoneError> {
        let mut current = self.record.lock().await;
        *current = record;

        let fragment = self.render(&current);
        debug!(
            "Rendered zone fragment for {}: {} bytes",
            current.name_part,
            fragment.len()
        );

        match write_fragment(&self.path, &fragment).await {
            Ok(()) => {
                info!("Wrote zone file: {}", self.path.display());
                metrics::record_zone_write(true);
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                metrics::record_zone_write(false);
                Err(e)
            }
        }
    }
}
