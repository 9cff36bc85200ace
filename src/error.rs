//! Error taxonomy for the sync core.
//!
//! Callers branch on the error kind rather than on an exception hierarchy:
//! initialization failures are fatal to the manager instance, credential
//! and transport failures are retryable, and a pull conflict is a normal
//! outcome that needs caller-driven resolution.

use thiserror::Error;

use crate::credentials::CredentialError;

/// The remote operation an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    /// Pushing local history to the remote.
    Push,
    /// Fetching and integrating remote history.
    Pull,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOperation::Push => write!(f, "push"),
            SyncOperation::Pull => write!(f, "pull"),
        }
    }
}

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The repository could not be created or opened.
    ///
    /// Fatal to the manager instance; the caller must reconstruct the
    /// manager or surface the failure to the user.
    #[error("repository initialization failed: {message}")]
    Initialization {
        /// Description of the failure
        message: String,
    },

    /// Credentials could not be resolved or were rejected.
    ///
    /// Retryable after the host supplies new credentials.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Network or protocol failure while talking to a remote.
    ///
    /// Wrapped with the remote URL and operation so the host can present
    /// a meaningful message and offer retry.
    #[error("{operation} failed for {remote}: {message}")]
    Transport {
        /// URL of the remote the transport was opened for
        remote: String,
        /// Which operation was in flight
        operation: SyncOperation,
        /// Underlying transport error text
        message: String,
    },

    /// Local and remote histories diverge and cannot fast-forward.
    ///
    /// Not a fatal failure: the working tree is left unchanged and the
    /// caller decides how to resolve.
    #[error("cannot fast-forward: {message}")]
    Conflict {
        /// Description of the divergence
        message: String,
    },

    /// The progress sink requested cancellation mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Git engine error needing no additional context.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl SyncError {
    pub(crate) fn init(err: &git2::Error) -> Self {
        SyncError::Initialization {
            message: err.message().to_string(),
        }
    }

    /// Classify a git2 error raised during a remote exchange.
    ///
    /// Authentication failures become [`SyncError::Credential`]; transport
    /// and protocol failures are wrapped as [`SyncError::Transport`] with
    /// the remote URL and operation attached; a user-aborted callback maps
    /// to [`SyncError::Cancelled`]; anything else is re-raised as-is.
    pub(crate) fn classify_remote(
        err: git2::Error,
        remote: &str,
        operation: SyncOperation,
    ) -> Self {
        if err.code() == git2::ErrorCode::User {
            return SyncError::Cancelled;
        }
        if err.code() == git2::ErrorCode::Auth {
            return SyncError::Credential(CredentialError::Rejected(remote.to_string()));
        }
        match err.class() {
            git2::ErrorClass::Net
            | git2::ErrorClass::Http
            | git2::ErrorClass::Ssh
            | git2::ErrorClass::Ssl
            | git2::ErrorClass::Repository
            | git2::ErrorClass::Os => SyncError::Transport {
                remote: remote.to_string(),
                operation,
                message: err.message().to_string(),
            },
            _ => SyncError::from(err),
        }
    }
}

impl From<git2::Error> for SyncError {
    fn from(err: git2::Error) -> Self {
        SyncError::Internal {
            message: err.message().to_string(),
        }
    }
}
