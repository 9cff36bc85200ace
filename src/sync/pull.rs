//! sync::pull
//!
//! Pull coordination: fetch from the configured remote, then integrate.
//!
//! Integration is fast-forward only. The working tree is checked out with
//! safe semantics before the branch ref moves, so a checkout conflict
//! leaves both the ref and the tree exactly as they were. Diverged
//! histories surface as [`SyncError::Conflict`] for the host to resolve.

use std::cell::RefCell;

use tracing::debug;

use crate::credentials::CredentialResolver;
use crate::error::{SyncError, SyncOperation};
use crate::progress::ProgressSink;
use crate::repo::{RepositoryHandle, DEFAULT_REMOTE};

use super::transport;

/// What a pull did to the local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The local branch already contained everything the remote had.
    UpToDate,
    /// The local branch was fast-forwarded to this commit.
    FastForwarded { commit: git2::Oid },
}

/// Fetch from the configured remote and fast-forward the local branch.
///
/// With no remote configured there is nothing to pull and the repository
/// is trivially up to date.
pub(crate) fn pull(
    handle: &RepositoryHandle,
    resolver: &CredentialResolver,
    progress: &dyn ProgressSink,
) -> Result<PullOutcome, SyncError> {
    let Some(url) = handle.remote_url() else {
        debug!("pull skipped: no remote configured");
        return Ok(PullOutcome::UpToDate);
    };

    if progress.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    progress.report(&format!("fetching from {}", url));

    fetch(handle, resolver, &url, progress)?;
    integrate(handle, progress)
}

/// Fetch the remote's configured refspecs, releasing the transport on
/// every path.
fn fetch(
    handle: &RepositoryHandle,
    resolver: &CredentialResolver,
    url: &str,
    progress: &dyn ProgressSink,
) -> Result<(), SyncError> {
    let repo = handle.raw();

    let cred_error = RefCell::new(None);

    let mut remote = repo
        .find_remote(DEFAULT_REMOTE)
        .map_err(|e| SyncError::classify_remote(e, url, SyncOperation::Pull))?;

    let result = {
        let mut callbacks = transport::base_callbacks(resolver, progress, &cred_error);
        callbacks.transfer_progress(|_| !progress.is_cancelled());

        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(callbacks);
        // An empty slice means the remote's configured fetch refspecs.
        remote.fetch(&[] as &[&str], Some(&mut options), None)
    };

    // Transport released before the result is inspected.
    let _ = remote.disconnect();

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(credential) = cred_error.into_inner() {
                return Err(SyncError::Credential(credential));
            }
            Err(SyncError::classify_remote(e, url, SyncOperation::Pull))
        }
    }
}

/// Integrate FETCH_HEAD into the local branch, fast-forward only.
fn integrate(
    handle: &RepositoryHandle,
    progress: &dyn ProgressSink,
) -> Result<PullOutcome, SyncError> {
    // The guard is released before fast_forward re-enters the handle.
    let target = {
        let repo = handle.raw();

        let fetch_head = match repo.find_reference("FETCH_HEAD") {
            Ok(reference) => reference,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                debug!("pull: fetch produced no FETCH_HEAD");
                return Ok(PullOutcome::UpToDate);
            }
            Err(e) => return Err(e.into()),
        };
        let fetched = repo.reference_to_annotated_commit(&fetch_head)?;

        let (analysis, _) = repo.merge_analysis(&[&fetched])?;

        if analysis.is_up_to_date() {
            debug!("pull: already up to date");
            return Ok(PullOutcome::UpToDate);
        }

        if !analysis.is_fast_forward() && !analysis.is_unborn() {
            return Err(SyncError::Conflict {
                message: "local and remote histories have diverged".to_string(),
            });
        }

        fetched.id()
    };

    fast_forward(handle, target, progress)
}

/// Move the current branch to `target` after checking out its tree.
///
/// Checkout runs first with safe semantics: if it would clobber local
/// modifications it fails without touching anything, and the branch ref
/// is never moved.
fn fast_forward(
    handle: &RepositoryHandle,
    target: git2::Oid,
    progress: &dyn ProgressSink,
) -> Result<PullOutcome, SyncError> {
    let leaf = handle.head_leaf_ref()?.ok_or_else(|| SyncError::Internal {
        message: "cannot fast-forward a detached HEAD".to_string(),
    })?;

    let repo = handle.raw();
    let commit = repo.find_commit(target)?;
    let tree = commit.tree()?;

    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(tree.as_object(), Some(&mut checkout))
        .map_err(|e| {
            if e.code() == git2::ErrorCode::Conflict {
                SyncError::Conflict {
                    message: "local changes would be overwritten by pull".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    // The leaf is already a full ref name, e.g. refs/heads/main.
    repo.reference(&leaf, target, true, "pull: fast-forward")?;
    repo.set_head(&leaf)?;

    let branch = leaf.trim_start_matches("refs/heads/");
    progress.report(&format!("fast-forwarded {} to {}", branch, target));
    debug!(branch = %branch, commit = %target, "fast-forwarded");
    Ok(PullOutcome::FastForwarded { commit: target })
}
