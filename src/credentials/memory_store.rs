//! credentials::memory_store
//!
//! In-process credential storage.
//!
//! Holds entries in a mutex-guarded map with no persistence. Intended for
//! tests and for hosts that manage persistence themselves and only need to
//! hand the manager a pre-populated store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::traits::{CredentialError, CredentialStore, Credentials};

/// Credential store backed by an in-process map.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, remote_url: &str) -> Result<Option<Credentials>, CredentialError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(remote_url).cloned())
    }

    fn save(&self, remote_url: &str, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(remote_url.to_string(), credentials.clone());
        Ok(())
    }

    fn erase(&self, remote_url: &str) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(remote_url);
        Ok(())
    }
}
