//! credentials::keychain_store
//!
//! Keychain-based credential storage using the OS keychain.
//!
//! # Platform Support
//!
//! This module uses the `keyring` crate which supports:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! # Feature Flag
//!
//! Only available with the `keychain` feature flag:
//!
//! ```toml
//! settings-sync = { version = "0.1", features = ["keychain"] }
//! ```
//!
//! # Storage Layout
//!
//! One keyring entry per remote URL, under a single service name. The
//! username is stored alongside the secret in the entry value as
//! `username\nsecret` so a lookup round-trips both halves.

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{CredentialError, CredentialStore, Credentials};

/// Credential store backed by the OS keychain.
///
/// Uses the OS keychain (macOS Keychain, Windows Credential Manager,
/// Linux Secret Service) via the `keyring` crate. Only available when
/// compiled with the `keychain` feature.
#[cfg(feature = "keychain")]
#[derive(Debug)]
pub struct KeychainCredentialStore {
    /// Service name for keychain entries
    service: String,
}

#[cfg(feature = "keychain")]
impl KeychainCredentialStore {
    /// Create a keychain store with the default service name.
    pub fn new() -> Result<Self, CredentialError> {
        Ok(Self {
            service: "settings-sync".to_string(),
        })
    }

    /// Create a keychain store with a custom service name.
    ///
    /// Primarily useful for testing to avoid conflicts.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The service name used for keychain entries.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, remote_url: &str) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, remote_url)
            .map_err(|e| CredentialError::ReadError(format!("cannot create keyring entry: {}", e)))
    }

    fn encode(credentials: &Credentials) -> String {
        format!("{}\n{}", credentials.username(), credentials.secret())
    }

    fn decode(value: &str) -> Option<Credentials> {
        let (username, secret) = value.split_once('\n')?;
        Some(Credentials::new(username, secret))
    }
}

#[cfg(feature = "keychain")]
impl CredentialStore for KeychainCredentialStore {
    fn lookup(&self, remote_url: &str) -> Result<Option<Credentials>, CredentialError> {
        let entry = self.entry(remote_url)?;

        match entry.get_password() {
            Ok(value) => Self::decode(&value)
                .map(Some)
                .ok_or_else(|| CredentialError::ReadError("malformed keychain entry".into())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(CredentialError::ReadError(
                "ambiguous keychain entry".to_string(),
            )),
            Err(e) => Err(CredentialError::ReadError(format!(
                "cannot read from keychain: {}",
                e
            ))),
        }
    }

    fn save(&self, remote_url: &str, credentials: &Credentials) -> Result<(), CredentialError> {
        let entry = self.entry(remote_url)?;

        entry
            .set_password(&Self::encode(credentials))
            .map_err(|e| CredentialError::WriteError(format!("cannot write to keychain: {}", e)))
    }

    fn erase(&self, remote_url: &str) -> Result<(), CredentialError> {
        let entry = self.entry(remote_url)?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine
            Err(e) => Err(CredentialError::WriteError(format!(
                "cannot delete from keychain: {}",
                e
            ))),
        }
    }
}

// Stub implementation when the keychain feature is disabled
#[cfg(not(feature = "keychain"))]
#[derive(Debug)]
pub struct KeychainCredentialStore {
    _private: (),
}

#[cfg(not(feature = "keychain"))]
impl KeychainCredentialStore {
    /// Create a keychain store.
    ///
    /// Always fails when compiled without the `keychain` feature.
    pub fn new() -> Result<Self, CredentialError> {
        Err(CredentialError::ProviderNotAvailable(
            "keychain support not enabled (compile with --features keychain)".into(),
        ))
    }
}

#[cfg(not(feature = "keychain"))]
impl CredentialStore for KeychainCredentialStore {
    fn lookup(&self, _remote_url: &str) -> Result<Option<Credentials>, CredentialError> {
        Err(CredentialError::ProviderNotAvailable("keychain".into()))
    }

    fn save(&self, _remote_url: &str, _credentials: &Credentials) -> Result<(), CredentialError> {
        Err(CredentialError::ProviderNotAvailable("keychain".into()))
    }

    fn erase(&self, _remote_url: &str) -> Result<(), CredentialError> {
        Err(CredentialError::ProviderNotAvailable("keychain".into()))
    }
}
