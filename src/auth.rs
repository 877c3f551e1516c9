// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Credential validation for update requests
//!
//! The single pre-shared password is never stored. Configuration holds an
//! Argon2id-derived key together with its salt and KDF parameters; a candidate
//! password is run through the same derivation and the result is compared
//! with the stored key in constant time.
//!
//! The pipeline only depends on the [`PasswordValidator`] trait, so tests (or
//! a different KDF) can be substituted without touching request handling.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// URL-safe base64, padding optional on decode, padded on encode
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Minimum decoded length for the stored key and the salt
pub const MIN_SECRET_LEN: usize = 8;

/// Default Argon2id parameters
pub const DEFAULT_TIME: u32 = 1;
pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
pub const DEFAULT_THREADS: u8 = 4;
pub const DEFAULT_KEY_LEN: u32 = 32;

/// Errors raised while building a validator or generating a credential
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("cannot serialize credential: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Minimal capability consumed by the request pipeline
pub trait PasswordValidator: Send + Sync {
    /// Returns true when `password` matches the configured credential
    fn validate(&self, password: &[u8]) -> bool;
}

/// Stored credential: derived key, salt and Argon2id parameters
///
/// `key` and `salt` are read from configuration as URL-safe base64. Values
/// that are not valid base64 are taken as their raw bytes.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Credential {
    /// Argon2id output for the real password
    #[serde(rename = "key", deserialize_with = "deserialize_secret")]
    pub stored_key: Vec<u8>,

    #[serde(deserialize_with = "deserialize_secret")]
    pub salt: Vec<u8>,

    /// Number of passes
    pub time: u32,

    /// Memory cost in KiB
    pub memory: u32,

    /// Degree of parallelism
    pub threads: u8,

    /// Derived key length in bytes
    #[serde(alias = "keylen")]
    pub key_len: u32,
}

impl Default for Credential {
    fn default() -> Self {
        Self {
            stored_key: Vec::new(),
            salt: Vec::new(),
            time: DEFAULT_TIME,
            memory: DEFAULT_MEMORY_KIB,
            threads: DEFAULT_THREADS,
            key_len: DEFAULT_KEY_LEN,
        }
    }
}

// Secrets never show up in logs or `validate-config` output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("stored_key", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("time", &self.time)
            .field("memory", &self.memory)
            .field("threads", &self.threads)
            .field("key_len", &self.key_len)
            .finish()
    }
}

/// Decode a base64 secret, falling back to the raw bytes of `value`
pub fn decode_secret(value: &str) -> Vec<u8> {
    URL_SAFE_LENIENT
        .decode(value)
        .unwrap_or_else(|_| value.as_bytes().to_vec())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(decode_secret(&value))
}

fn argon2id(
    time: u32,
    memory: u32,
    threads: u8,
    key_len: u32,
) -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(memory, time, u32::from(threads), Some(key_len as usize))
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Derive an Argon2id key from `password` and `salt`
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    time: u32,
    memory: u32,
    threads: u8,
    key_len: u32,
) -> Result<Vec<u8>, CredentialError> {
    let argon2 = argon2id(time, memory, threads, key_len)?;
    let mut key = vec![0u8; key_len as usize];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| CredentialError::Derivation(e.to_string()))?;
    Ok(key)
}

/// Argon2id-backed [`PasswordValidator`]
#[derive(Clone)]
pub struct Argon2Validator {
    argon2: Argon2<'static>,
    stored_key: Vec<u8>,
    salt: Vec<u8>,
    key_len: usize,
}

impl Argon2Validator {
    /// Build a validator, rejecting KDF parameters Argon2 cannot run with.
    ///
    /// All parameter problems surface here so that [`PasswordValidator::validate`]
    /// never fails at request time.
    pub fn new(credential: &Credential) -> Result<Self, CredentialError> {
        if credential.salt.len() < MIN_SECRET_LEN {
            return Err(CredentialError::InvalidParams(format!(
                "salt must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let argon2 = argon2id(
            credential.time,
            credential.memory,
            credential.threads,
            credential.key_len,
        )?;

        if credential.stored_key.len() != credential.key_len as usize {
            return Err(CredentialError::InvalidParams(format!(
                "stored key is {} bytes but key_len is {}",
                credential.stored_key.len(),
                credential.key_len
            )));
        }

        Ok(Self {
            argon2,
            stored_key: credential.stored_key.clone(),
            salt: credential.salt.clone(),
            key_len: credential.key_len as usize,
        })
    }
}

impl fmt::Debug for Argon2Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2Validator")
            .field("key_len", &self.key_len)
            .finish_non_exhaustive()
    }
}

impl PasswordValidator for Argon2Validator {
    fn validate(&self, password: &[u8]) -> bool {
        let mut candidate = vec![0u8; self.key_len];
        if self
            .argon2
            .hash_password_into(password, &self.salt, &mut candidate)
            .is_err()
        {
            return false;
        }

        candidate.as_slice().ct_eq(self.stored_key.as_slice()).into()
    }
}

/// Constant-time username check. An empty candidate never matches.
pub fn verify_user(expected: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Parameters for `generate-password`
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub salt_len: usize,
    pub password_len: usize,
    pub time: u32,
    pub memory: u32,
    pub threads: u8,
    pub key_len: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            salt_len: 16,
            password_len: 32,
            time: DEFAULT_TIME,
            memory: DEFAULT_MEMORY_KIB,
            threads: DEFAULT_THREADS,
            key_len: DEFAULT_KEY_LEN,
        }
    }
}

/// A freshly generated password and the credential that verifies it
pub struct GeneratedCredential {
    pub password: Vec<u8>,
    pub credential: Credential,
}

#[derive(Serialize)]
struct PasswordBlock {
    key: String,
    salt: String,
    time: u32,
    memory: u32,
    threads: u8,
    key_len: u32,
}

#[derive(Serialize)]
struct PasswordSection {
    password: PasswordBlock,
}

impl GeneratedCredential {
    /// The password as handed to clients (URL-safe base64)
    pub fn encoded_password(&self) -> String {
        URL_SAFE_LENIENT.encode(&self.password)
    }

    /// `password:` block ready to paste into the `updater` config section
    pub fn to_config_yaml(&self) -> Result<String, CredentialError> {
        let section = PasswordSection {
            password: PasswordBlock {
                key: URL_SAFE_LENIENT.encode(&self.credential.stored_key),
                salt: URL_SAFE_LENIENT.encode(&self.credential.salt),
                time: self.credential.time,
                memory: self.credential.memory,
                threads: self.credential.threads,
                key_len: self.credential.key_len,
            },
        };
        Ok(serde_yaml::to_string(&section)?)
    }
}

/// Generate a random salt and password and derive the matching key
pub fn generate_credential(
    options: &GenerateOptions,
) -> Result<GeneratedCredential, CredentialError> {
    let mut salt = vec![0u8; options.salt_len];
    OsRng.fill_bytes(&mut salt);

    let mut password = vec![0u8; options.password_len];
    OsRng.fill_bytes(&mut password);

    let stored_key = derive_key(
        &password,
        &salt,
        options.time,
        options.memory,
        options.threads,
        options.key_len,
    )?;

    Ok(GeneratedCredential {
        password,
        credential: Credential {
            stored_key,
            salt,
            time: options.time,
            memory: options.memory,
            threads: options.threads,
            key_len: options.key_len,
        },
    })
}
