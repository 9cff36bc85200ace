//! credentials::traits
//!
//! Credential storage trait definition.
//!
//! # Design
//!
//! The `CredentialStore` trait defines a simple lookup/save interface keyed
//! by remote URL. The persistent store is an external collaborator: it may
//! prompt the user interactively, consult an OS keychain, or read a file.
//! The core only requires that it eventually yields usable credentials or
//! fails.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secrets in error messages
//! - Use storage mechanisms appropriate to the platform
//! - Be thread-safe (Send + Sync)

use thiserror::Error;

/// Errors from credential storage and resolution.
///
/// Note: error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credentials stored for the given remote URL.
    #[error("no credentials found for {0}")]
    NotFound(String),

    /// The remote rejected the supplied credentials.
    ///
    /// Retryable once the host supplies new credentials and constructs a
    /// fresh manager (the per-manager cache has no invalidation path).
    #[error("authentication failed for {0}")]
    Rejected(String),

    /// Failed to read from the credential store.
    #[error("failed to read credentials: {0}")]
    ReadError(String),

    /// Failed to write to the credential store.
    #[error("failed to write credentials: {0}")]
    WriteError(String),

    /// Permission denied accessing the credential store.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Provider not available or not configured.
    #[error("credential provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// A username/secret pair for one remote.
///
/// The secret is kept private and redacted from `Debug` output so the
/// struct can appear in diagnostics without leaking.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    /// Create credentials from a username and secret.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// The account name presented to the remote.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The raw secret. Do not log or print it.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Trait for credential storage providers.
///
/// Implementations must be thread-safe (Send + Sync) and must never log,
/// print, or include secret values in error messages. Lookups may block on
/// interactive prompting; the core treats that as opaque.
///
/// # Keys
///
/// Entries are keyed by the remote URL as configured on the repository
/// (e.g. `https://git.example.com/settings.git`). The implementation
/// stores keys as-is without interpretation.
pub trait CredentialStore: Send + Sync {
    /// Look up credentials for a remote URL.
    ///
    /// Returns `Ok(Some(credentials))` if an entry exists,
    /// `Ok(None)` if there is no entry for the URL, and
    /// `Err` if the store itself could not be accessed.
    fn lookup(&self, remote_url: &str) -> Result<Option<Credentials>, CredentialError>;

    /// Save credentials for a remote URL, overwriting any existing entry.
    fn save(&self, remote_url: &str, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Remove the entry for a remote URL.
    ///
    /// Returns `Ok(())` even if no entry existed, making erase idempotent.
    fn erase(&self, remote_url: &str) -> Result<(), CredentialError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn accessors() {
        let creds = Credentials::new("alice", "hunter2");
        assert_eq!(creds.username(), "alice");
        assert_eq!(creds.secret(), "hunter2");
    }

    #[test]
    fn error_display_formatting() {
        let err = CredentialError::NotFound("https://example.com/r.git".into());
        assert!(err.to_string().contains("no credentials"));
        assert!(err.to_string().contains("example.com"));

        let err = CredentialError::Rejected("https://example.com/r.git".into());
        assert!(err.to_string().contains("authentication failed"));

        let err = CredentialError::ReadError("disk full".into());
        assert!(err.to_string().contains("read"));

        let err = CredentialError::WriteError("read-only fs".into());
        assert!(err.to_string().contains("write"));

        let err = CredentialError::PermissionDenied("denied".into());
        assert!(err.to_string().contains("permission"));

        let err = CredentialError::ProviderNotAvailable("keychain".into());
        assert!(err.to_string().contains("provider"));
    }
}
