//! sync::transport
//!
//! Remote callback wiring shared by push and pull.
//!
//! Credentials are attached lazily: the resolver is only consulted when a
//! transport actually asks for authentication, so local-path remotes never
//! touch the credential store. A resolution failure is parked in a cell so
//! the coordinator can surface the original `CredentialError` instead of
//! the opaque callback error git2 reports.

use std::cell::RefCell;

use crate::credentials::{CredentialError, CredentialResolver};
use crate::progress::ProgressSink;

/// Build the callbacks common to every remote exchange: credential
/// resolution and sideband progress reporting.
pub(crate) fn base_callbacks<'a>(
    resolver: &'a CredentialResolver,
    progress: &'a dyn ProgressSink,
    cred_error: &'a RefCell<Option<CredentialError>>,
) -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();

    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return git2::Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            match resolver.resolve(url) {
                Ok(credentials) => {
                    return git2::Cred::userpass_plaintext(
                        credentials.username(),
                        credentials.secret(),
                    );
                }
                Err(e) => {
                    *cred_error.borrow_mut() = Some(e);
                    return Err(git2::Error::new(
                        git2::ErrorCode::Auth,
                        git2::ErrorClass::Callback,
                        "credential resolution failed",
                    ));
                }
            }
        }
        git2::Cred::default()
    });

    callbacks.sideband_progress(move |data| {
        if let Ok(text) = std::str::from_utf8(data) {
            let text = text.trim();
            if !text.is_empty() {
                progress.report(text);
            }
        }
        true
    });

    callbacks
}
