//! credentials
//!
//! Credential storage abstraction and per-manager resolution.
//!
//! # Architecture
//!
//! Remote credentials flow through the [`CredentialStore`] trait, keyed by
//! remote URL. The store is an external collaborator: it may prompt the
//! user, consult an OS keychain, or read a file. Implementations:
//!
//! - [`FileCredentialStore`]: `~/.settings-sync/credentials.toml` (default)
//! - [`KeychainCredentialStore`]: OS keychain (feature-gated)
//! - [`MemoryCredentialStore`]: in-process map for tests and embedding hosts
//!
//! The [`CredentialResolver`] sits between the manager and the store: it
//! resolves credentials lazily on first need and caches them for the
//! lifetime of the manager instance.
//!
//! # Security
//!
//! All store implementations follow these rules:
//!
//! - Secrets are **never** logged or included in error messages
//! - The file store uses 0600 permissions on Unix and atomic writes
//! - `Credentials` redacts its secret from `Debug` output

mod file_store;
mod keychain_store;
mod memory_store;
mod resolver;
mod traits;

pub use file_store::FileCredentialStore;
pub use keychain_store::KeychainCredentialStore;
pub use memory_store::MemoryCredentialStore;
pub use resolver::CredentialResolver;
pub use traits::{CredentialError, CredentialStore, Credentials};

/// Create a credential store based on the provider name.
///
/// # Providers
///
/// - `"file"` (default): [`FileCredentialStore`]
/// - `"keychain"`: [`KeychainCredentialStore`] (requires the feature)
/// - `"memory"`: [`MemoryCredentialStore`]
///
/// # Errors
///
/// - Unknown provider name
/// - Keychain provider without the `keychain` feature enabled
/// - Initialization errors from the store
pub fn create_store(provider: &str) -> Result<Box<dyn CredentialStore>, CredentialError> {
    match provider {
        "file" => Ok(Box::new(FileCredentialStore::new()?)),
        "memory" => Ok(Box::new(MemoryCredentialStore::new())),
        #[cfg(feature = "keychain")]
        "keychain" => Ok(Box::new(KeychainCredentialStore::new()?)),
        #[cfg(not(feature = "keychain"))]
        "keychain" => Err(CredentialError::ProviderNotAvailable(
            "keychain support not enabled (compile with --features keychain)".into(),
        )),
        other => Err(CredentialError::ProviderNotAvailable(format!(
            "unknown credential provider: '{}' (valid: file, keychain, memory)",
            other
        ))),
    }
}

/// The default credential store provider name.
pub const DEFAULT_PROVIDER: &str = "file";
