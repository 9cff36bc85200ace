//! credentials::resolver
//!
//! Per-manager lazy credential cache.
//!
//! # Design
//!
//! Credentials for the configured remote are resolved on first need and
//! then shared by every push and pull for the lifetime of the manager
//! instance. There is deliberately no invalidation path: the host retries
//! a failed authentication by saving new credentials to the store and
//! constructing a new manager.
//!
//! Initialization is check-then-create under a mutex, so two operations
//! racing on first use still resolve exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use super::traits::{CredentialError, CredentialStore, Credentials};

/// Lazily resolves and caches credentials for one manager instance.
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    cached: Mutex<Option<Arc<Credentials>>>,
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resolved = self
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("CredentialResolver")
            .field("resolved", &resolved)
            .finish()
    }
}

impl CredentialResolver {
    /// Create a resolver backed by the given store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Resolve credentials for `remote_url`.
    ///
    /// The first call consults the store (which may prompt the user);
    /// subsequent calls return the cached instance without touching the
    /// store again, regardless of the URL passed.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::NotFound`] if the store has no entry
    /// - Any store access error, propagated unchanged
    pub fn resolve(&self, remote_url: &str) -> Result<Arc<Credentials>, CredentialError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(credentials) = cached.as_ref() {
            return Ok(Arc::clone(credentials));
        }

        let credentials = self
            .store
            .lookup(remote_url)?
            .ok_or_else(|| CredentialError::NotFound(remote_url.to_string()))?;

        let credentials = Arc::new(credentials);
        *cached = Some(Arc::clone(&credentials));
        Ok(credentials)
    }

    /// Whether credentials have already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
