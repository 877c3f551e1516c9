// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Update request pipeline
//!
//! An update request runs through these stages in order; the first failing
//! stage ends the request:
//! 1. Username (`user`): constant-time match against the configured user
//! 2. Password (`passwd`): Argon2id check via the [`PasswordValidator`],
//!    with at most `max_concurrent_hashes` derivations running at once
//! 3. Addresses (`ipaddr`, `ip6addr`): optional, family-checked literals
//! 4. Update: replace the zone record and rewrite the zone fragment
//!
//! Parsed addresses travel to the last stage as a [`ValidatedAddresses`]
//! value and are never parsed again. Nothing is mutated before stage 4.

use axum::extract::{rejection::QueryRejection, Query, State};
use base64::Engine;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    auth::{verify_user, PasswordValidator, URL_SAFE_LENIENT},
    metrics,
    types::{AppState, UpdateError, UpdateParams},
    zones::SubdomainRecord,
};

/// Body returned for a successful update
pub const OK_BODY: &str = "Ok\n";

/// Addresses that passed the address stage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedAddresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Username stage
pub fn check_user(expected: &str, params: &UpdateParams) -> Result<(), UpdateError> {
    let candidate = non_empty(&params.user).ok_or_else(|| {
        warn!("Update rejected: missing credentials");
        UpdateError::Unauthorized
    })?;

    if !verify_user(expected, candidate) {
        warn!("Update rejected: user or password wrong");
        return Err(UpdateError::Unauthorized);
    }

    Ok(())
}

/// Byte strings tried against the validator for a `passwd` value
///
/// The value itself, and if it is valid URL-safe base64 (the form printed by
/// `generate-password`), its decoded bytes as well.
pub fn password_candidates(passwd: &str) -> Vec<Vec<u8>> {
    let mut candidates = vec![passwd.as_bytes().to_vec()];
    if let Ok(decoded) = URL_SAFE_LENIENT.decode(passwd) {
        if decoded != passwd.as_bytes() {
            candidates.push(decoded);
        }
    }
    candidates
}

/// Password stage
///
/// Key derivation is CPU and memory heavy, so it runs on the blocking pool,
/// and only while holding a permit from `hash_limit`. The permit moves into
/// the blocking task and is released when the derivation finishes, even if
/// the request was dropped meanwhile. Every candidate is checked, matching
/// or not.
pub async fn check_password(
    validator: &Arc<dyn PasswordValidator>,
    hash_limit: &Arc<Semaphore>,
    params: &UpdateParams,
) -> Result<(), UpdateError> {
    let passwd = non_empty(&params.passwd).ok_or_else(|| {
        warn!("Update rejected: missing credentials");
        UpdateError::Unauthorized
    })?;

    let permit = Arc::clone(hash_limit).acquire_owned().await.map_err(|e| {
        error!("Password validation limit closed: {}", e);
        UpdateError::Internal(e.to_string())
    })?;

    let candidates = password_candidates(passwd);
    let validator = Arc::clone(validator);
    let valid = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        candidates
            .iter()
            .fold(false, |matched, candidate| validator.validate(candidate) | matched)
    })
    .await
    .map_err(|e| {
        error!("Password validation task failed: {}", e);
        UpdateError::Internal(e.to_string())
    })?;

    if !valid {
        warn!("Update rejected: user or password wrong");
        return Err(UpdateError::Unauthorized);
    }

    Ok(())
}

fn parse_ipv4(value: Option<&str>) -> Result<Option<Ipv4Addr>, UpdateError> {
    match value.map(str::parse::<IpAddr>) {
        None => Ok(None),
        Some(Ok(IpAddr::V4(addr))) => Ok(Some(addr)),
        Some(_) => Err(UpdateError::InvalidIpv4),
    }
}

fn parse_ipv6(value: Option<&str>) -> Result<Option<Ipv6Addr>, UpdateError> {
    match value.map(str::parse::<IpAddr>) {
        None => Ok(None),
        Some(Ok(IpAddr::V6(addr))) => Ok(Some(addr)),
        Some(_) => Err(UpdateError::InvalidIpv6),
    }
}

/// Address stage
///
/// Absent or empty parameters mean "not provided". Both parameters are
/// checked; when both are wrong the `ipaddr` error is reported.
pub fn parse_addresses(params: &UpdateParams) -> Result<ValidatedAddresses, UpdateError> {
    let ipv4 = parse_ipv4(non_empty(&params.ipaddr));
    let ipv6 = parse_ipv6(non_empty(&params.ip6addr));

    match (ipv4, ipv6) {
        (Ok(ipv4), Ok(ipv6)) => Ok(ValidatedAddresses { ipv4, ipv6 }),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Update rejected: {}", e);
            Err(e)
        }
    }
}

/// Update stage: replace the record and rewrite the zone fragment
pub async fn apply_update(
    state: &AppState,
    addresses: ValidatedAddresses,
) -> Result<(), UpdateError> {
    let current = state.zone.current_record().await;
    let record = SubdomainRecord {
        name_part: current.name_part,
        ttl: current.ttl,
        ipv4: addresses.ipv4,
        ipv6: addresses.ipv6,
    };

    info!(
        "Updating {}: ipv4={:?} ipv6={:?}",
        record.name_part, record.ipv4, record.ipv6
    );

    state.zone.update(record).await?;
    Ok(())
}

/// Run the whole pipeline for one request
pub async fn run_pipeline(state: &AppState, params: &UpdateParams) -> Result<(), UpdateError> {
    check_user(&state.user, params)?;
    check_password(&state.validator, &state.hash_limit, params).await?;
    let addresses = parse_addresses(params)?;
    debug!("Update request validated");
    apply_update(state, addresses).await
}

/// Update endpoint
///
/// `GET /?user=<user>&passwd=<password>[&ipaddr=<ipv4>][&ip6addr=<ipv6>]`
///
/// # Responses
/// - 200 `Ok`
/// - 401 `user or password wrong`
/// - 400 `ipaddr is incorrect` / `ip6addr is incorrect`
/// - 500 `cannot write zonefile`
pub async fn update(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<&'static str, UpdateError> {
    // An unreadable query string carries no credentials, so the username
    // stage rejects it like any other unauthenticated request.
    let params = match query {
        Ok(Query(pairs)) => UpdateParams::from_pairs(pairs),
        Err(e) => {
            debug!("Unreadable update query: {}", e);
            UpdateParams::default()
        }
    };

    match run_pipeline(&state, &params).await {
        Ok(()) => {
            metrics::record_update("ok");
            Ok(OK_BODY)
        }
        Err(e) => {
            metrics::record_update(e.metric_label());
            Err(e)
        }
    }
}
