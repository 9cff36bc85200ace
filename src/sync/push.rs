//! sync::push
//!
//! Push coordination across every configured push URL.
//!
//! Refspecs come from `remote.origin.push` when set, otherwise from the
//! branch HEAD points at. A remote may carry several push URLs; each one
//! gets its own anonymous transport, and every transport is released
//! before its result is inspected. The remote's refs are listed before
//! anything is sent, so a destination already at its local source commit
//! is reported as up to date rather than pushed again. Per-ref outcomes
//! are collected into a [`PushReport`] rather than logged ad hoc, so
//! callers can present them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::credentials::{CredentialError, CredentialResolver};
use crate::error::{SyncError, SyncOperation};
use crate::progress::ProgressSink;
use crate::repo::RepositoryHandle;

use super::transport;

/// Outcome for a single remote ref during a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdateStatus {
    /// The remote accepted the update.
    Accepted,
    /// The remote was already at the pushed commit.
    UpToDate,
    /// The remote refused the update, with its stated reason.
    Rejected { reason: String },
}

impl fmt::Display for RefUpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefUpdateStatus::Accepted => write!(f, "accepted"),
            RefUpdateStatus::UpToDate => write!(f, "up to date"),
            RefUpdateStatus::Rejected { reason } => write!(f, "rejected: {}", reason),
        }
    }
}

/// One remote ref and what happened to it.
#[derive(Debug, Clone)]
pub struct RefUpdate {
    pub refname: String,
    pub status: RefUpdateStatus,
}

/// Per-ref outcomes for one push, across all push URLs.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    pub updates: Vec<RefUpdate>,
}

impl PushReport {
    /// Updates the remote refused.
    pub fn rejected(&self) -> impl Iterator<Item = &RefUpdate> {
        self.updates
            .iter()
            .filter(|u| matches!(u.status, RefUpdateStatus::Rejected { .. }))
    }
}

/// Push the local branch to every configured push URL.
///
/// With no configured refspecs and a detached or missing HEAD there is
/// nothing to push; the report comes back empty and no transport is
/// opened. Cancellation is honored between URLs, never mid-transfer.
pub(crate) fn push(
    handle: &RepositoryHandle,
    resolver: &CredentialResolver,
    progress: &dyn ProgressSink,
) -> Result<PushReport, SyncError> {
    let refspecs = resolve_push_refspecs(handle)?;
    if refspecs.is_empty() {
        debug!("push skipped: no refspecs and HEAD is not on a branch");
        return Ok(PushReport::default());
    }

    let urls = handle.push_urls()?;
    if urls.is_empty() {
        debug!("push skipped: no push URL configured");
        return Ok(PushReport::default());
    }

    let refspec_refs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
    let mut report = PushReport::default();

    for url in &urls {
        if progress.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        progress.report(&format!("pushing to {}", url));
        let updates = push_one(handle, resolver, url, &refspec_refs, progress)?;
        report.updates.extend(updates);
    }

    log_ref_updates(&report);
    Ok(report)
}

/// Open one transport to `url`, push, and release the transport whatever
/// the outcome.
fn push_one(
    handle: &RepositoryHandle,
    resolver: &CredentialResolver,
    url: &str,
    refspecs: &[&str],
    progress: &dyn ProgressSink,
) -> Result<Vec<RefUpdate>, SyncError> {
    let repo = handle.raw();

    let cred_error = RefCell::new(None);

    let mut remote = repo
        .remote_anonymous(url)
        .map_err(|e| SyncError::classify_remote(e, url, SyncOperation::Push))?;

    let result = push_behind(&repo, &mut remote, resolver, refspecs, progress, &cred_error);

    // Transport released before the result is inspected.
    let _ = remote.disconnect();

    match result {
        Ok(updates) => Ok(updates),
        Err(e) => {
            if let Some(credential) = cred_error.into_inner() {
                return Err(SyncError::Credential(credential));
            }
            Err(SyncError::classify_remote(e, url, SyncOperation::Push))
        }
    }
}

/// List the remote's refs, report destinations already at their local
/// source as up to date, and push only the refspecs that are behind.
///
/// libgit2 reports a `None` status for every pushed ref, including ones
/// the remote already had, so up-to-date detection has to happen against
/// the advertised refs before anything is sent.
fn push_behind(
    repo: &git2::Repository,
    remote: &mut git2::Remote<'_>,
    resolver: &CredentialResolver,
    refspecs: &[&str],
    progress: &dyn ProgressSink,
    cred_error: &RefCell<Option<CredentialError>>,
) -> Result<Vec<RefUpdate>, git2::Error> {
    let remote_heads: HashMap<String, git2::Oid> = {
        let callbacks = transport::base_callbacks(resolver, progress, cred_error);
        let conn = remote.connect_auth(git2::Direction::Push, Some(callbacks), None)?;
        conn.list()?
            .iter()
            .map(|head| (head.name().to_string(), head.oid()))
            .collect()
    };

    let mut updates = Vec::new();
    let mut pending = Vec::new();
    for spec in refspecs {
        let (src, dst) = refspec_parts(spec);
        let local = repo.refname_to_id(src).ok();
        match (local, remote_heads.get(dst)) {
            (Some(local), Some(advertised)) if local == *advertised => {
                updates.push(RefUpdate {
                    refname: dst.to_string(),
                    status: RefUpdateStatus::UpToDate,
                });
            }
            _ => pending.push(*spec),
        }
    }

    if pending.is_empty() {
        return Ok(updates);
    }

    let collected: RefCell<Vec<RefUpdate>> = RefCell::new(Vec::new());
    let mut callbacks = transport::base_callbacks(resolver, progress, cred_error);
    callbacks.push_update_reference(|refname, status| {
        let status = match status {
            None => RefUpdateStatus::Accepted,
            Some(reason) => RefUpdateStatus::Rejected {
                reason: reason.to_string(),
            },
        };
        collected.borrow_mut().push(RefUpdate {
            refname: refname.to_string(),
            status,
        });
        Ok(())
    });

    let mut options = git2::PushOptions::new();
    options.remote_callbacks(callbacks);
    remote.push(&pending, Some(&mut options))?;

    updates.append(&mut collected.borrow_mut());
    Ok(updates)
}

/// Refspecs for this push: configured `remote.origin.push` entries, or a
/// single spec for the branch HEAD points at.
fn resolve_push_refspecs(handle: &RepositoryHandle) -> Result<Vec<String>, SyncError> {
    let configured = handle.configured_push_refspecs()?;
    if !configured.is_empty() {
        return Ok(configured);
    }
    // The leaf is a full ref name, e.g. refs/heads/main.
    match handle.head_leaf_ref()? {
        Some(leaf) => Ok(vec![format!("{leaf}:{leaf}")]),
        None => Ok(Vec::new()),
    }
}

/// Source and destination sides of a refspec, tolerating a force marker
/// and a bare ref.
fn refspec_parts(spec: &str) -> (&str, &str) {
    let spec = spec.strip_prefix('+').unwrap_or(spec);
    match spec.split_once(':') {
        Some((src, dst)) => (src, dst),
        None => (spec, spec),
    }
}

fn log_ref_updates(report: &PushReport) {
    for update in &report.updates {
        match &update.status {
            RefUpdateStatus::Rejected { reason } => {
                warn!(refname = %update.refname, %reason, "push rejected");
            }
            status => {
                debug!(refname = %update.refname, %status, "push ref update");
            }
        }
    }
}
