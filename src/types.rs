// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common types and errors used throughout the dynzone library

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::{
    auth::{Argon2Validator, CredentialError, PasswordValidator},
    config::{UpdaterConfig, DEFAULT_MAX_CONCURRENT_HASHES},
    zones::{SubdomainRecord, ZoneError, ZoneFile},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configured username
    pub user: Arc<str>,
    /// Password check
    pub validator: Arc<dyn PasswordValidator>,
    /// Managed zone fragment
    pub zone: Arc<ZoneFile>,
    /// Bounds concurrent password derivations
    pub hash_limit: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        user: impl Into<Arc<str>>,
        validator: Arc<dyn PasswordValidator>,
        zone: ZoneFile,
    ) -> Self {
        Self {
            user: user.into(),
            validator,
            zone: Arc::new(zone),
            hash_limit: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_HASHES)),
        }
    }

    /// Allow at most `permits` password derivations at once
    pub fn with_hash_limit(mut self, permits: usize) -> Self {
        self.hash_limit = Arc::new(Semaphore::new(permits));
        self
    }

    /// Build the state for a validated updater configuration
    ///
    /// Fails when the Argon2 parameters are unusable.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self, CredentialError> {
        let validator = Argon2Validator::new(&config.password)?;

        let record = SubdomainRecord {
            ttl: config.ttl,
            ..SubdomainRecord::new(config.domain_subpart.clone())
        };
        let zone = ZoneFile::new(
            config.filename.clone(),
            config.hostname_placeholder.clone(),
            record,
        );

        Ok(Self::new(config.user.as_str(), Arc::new(validator), zone)
            .with_hash_limit(config.max_concurrent_hashes))
    }
}

/// Query parameters of an update request
///
/// Every field is optional at this level; the pipeline decides which
/// absences are errors. An empty value counts as absent.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdateParams {
    pub user: Option<String>,
    pub passwd: Option<String>,
    pub ipaddr: Option<String>,
    pub ip6addr: Option<String>,
}

impl UpdateParams {
    /// Build from decoded query pairs
    ///
    /// The first occurrence of a parameter wins; later duplicates and
    /// unknown parameters are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "user" => &mut params.user,
                "passwd" => &mut params.passwd,
                "ipaddr" => &mut params.ipaddr,
                "ip6addr" => &mut params.ip6addr,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Update request error
///
/// The display strings are the literal response bodies. Authentication
/// failures never say which of user or password was wrong.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("user or password wrong")]
    Unauthorized,

    #[error("ipaddr is incorrect")]
    InvalidIpv4,

    #[error("ip6addr is incorrect")]
    InvalidIpv6,

    #[error("cannot write zonefile")]
    ZoneWrite(#[from] ZoneError),

    #[error("internal server error")]
    Internal(String),
}

impl UpdateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpdateError::Unauthorized => StatusCode::UNAUTHORIZED,
            UpdateError::InvalidIpv4 | UpdateError::InvalidIpv6 => StatusCode::BAD_REQUEST,
            UpdateError::ZoneWrite(_) | UpdateError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label used for the `dynzone_update_requests_total` metric
    pub fn metric_label(&self) -> &'static str {
        match self {
            UpdateError::Unauthorized => "unauthorized",
            UpdateError::InvalidIpv4 | UpdateError::InvalidIpv6 => "bad_request",
            UpdateError::ZoneWrite(_) => "write_error",
            UpdateError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for UpdateError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{}\n", self)).into_response()
    }
}
