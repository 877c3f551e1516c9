// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration file loading and validation
//!
//! The service reads a single YAML file. Everything needed to serve update
//! requests is checked at load time; a config that loads successfully never
//! produces configuration errors while handling requests.
//!
//! ```yaml
//! http_port: 9000
//! log:
//!   level: info
//! updater:
//!   user: baz
//!   filename: /srv/dns/dyndns.zone
//!   domain_subpart: home
//!   password:
//!     key: <output of `dynzone generate-password`>
//!     salt: <output of `dynzone generate-password`>
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{
    auth::{Argon2Validator, Credential, CredentialError, MIN_SECRET_LEN},
    zones::{DEFAULT_HOSTNAME_PLACEHOLDER, DEFAULT_TTL},
};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_PATH: &str = ".dynzone.yaml";

pub const DEFAULT_HTTP_PORT: u16 = 9000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Password derivations allowed to run at the same time
pub const DEFAULT_MAX_CONCURRENT_HASHES: usize = 4;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required configuration:\n\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listen port
    #[serde(default = "default_http_port", alias = "httpport")]
    pub http_port: u16,

    /// HTTP listen address
    #[serde(default = "default_bind_address", alias = "bindaddress")]
    pub bind_address: String,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default, alias = "updaterhandler", alias = "updater_handler")]
    pub updater: UpdaterConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON lines instead of compact text
    #[serde(default = "default_true")]
    pub json: bool,

    /// Append logs to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Log every HTTP request
    #[serde(default = "default_true", alias = "accesslog", alias = "enabled")]
    pub access_log: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: true,
            file: None,
            access_log: true,
        }
    }
}

/// Update endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Username clients must present
    pub user: String,

    /// Argon2id credential for the password
    pub password: Credential,

    /// Zone fragment written on every update
    pub filename: PathBuf,

    /// Subdomain label of the managed record
    #[serde(alias = "domainsubpart")]
    pub domain_subpart: String,

    /// Hostname token emitted after the subdomain label
    #[serde(alias = "hostnameplaceholder")]
    pub hostname_placeholder: String,

    /// TTL of the rendered records
    pub ttl: u32,

    /// Upper bound on concurrent Argon2id derivations (each uses `memory` KiB)
    #[serde(alias = "maxconcurrenthashes")]
    pub max_concurrent_hashes: usize,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: Credential::default(),
            filename: PathBuf::new(),
            domain_subpart: String::new(),
            hostname_placeholder: DEFAULT_HOSTNAME_PLACEHOLDER.to_string(),
            ttl: DEFAULT_TTL,
            max_concurrent_hashes: DEFAULT_MAX_CONCURRENT_HASHES,
        }
    }
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Read, parse and validate the config file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every required setting is present and that the Argon2
    /// parameters are usable
    ///
    /// Missing settings are reported all at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let updater = &self.updater;

        if updater.user.is_empty() {
            errors.push("undefined user".to_string());
        }

        if updater.filename.as_os_str().is_empty() {
            errors.push("undefined filename for zonefile".to_string());
        }

        if updater.domain_subpart.is_empty() {
            errors.push("undefined domain subpart like HOME.dyndns.example.com".to_string());
        }

        if updater.password.stored_key.len() < MIN_SECRET_LEN {
            errors.push("undefined/short password key".to_string());
        } else if updater.password.stored_key.len() != updater.password.key_len as usize {
            errors.push(format!(
                "password key is {} bytes, does not match key_len {}",
                updater.password.stored_key.len(),
                updater.password.key_len
            ));
        }

        if updater.password.salt.len() < MIN_SECRET_LEN {
            errors.push("undefined/short password salt".to_string());
        }

        if updater.max_concurrent_hashes == 0
            || updater.max_concurrent_hashes > tokio::sync::Semaphore::MAX_PERMITS
        {
            errors.push("max_concurrent_hashes out of range".to_string());
        }

        if self.http_port == 0 {
            errors.push("http port must not be 0".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Argon2Validator::new(&updater.password)?;
        Ok(())
    }

    /// `host:port` to listen on
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }
}

// Summary printed by `validate-config`; the credential stays redacted.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "listen: {}", self.listen_address())?;
        writeln!(
            f,
            "log: level={} json={} access_log={} file={}",
            self.log.level,
            self.log.json,
            self.log.access_log,
            self.log
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_string())
        )?;
        writeln!(f, "user: {}", self.updater.user)?;
        writeln!(f, "zonefile: {}", self.updater.filename.display())?;
        writeln!(
            f,
            "record: {}.{}. ttl={}",
            self.updater.domain_subpart, self.updater.hostname_placeholder, self.updater.ttl
        )?;
        write!(
            f,
            "argon2id: time={} memory={}KiB threads={} key_len={}",
            self.updater.password.time,
            self.updater.password.memory,
            self.updater.password.threads,
            self.updater.password.key_len
        )
    }
}
