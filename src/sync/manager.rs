//! sync::manager
//!
//! The [`SyncManager`] owns one repository, one credential resolver, and
//! the single lock that serializes commit construction.
//!
//! # Design
//!
//! Commits are the only operations that mutate the index and HEAD from
//! library code, so they take the lock for their whole stage-and-commit
//! span. Push and pull run outside the lock: the host sequences them
//! against commits, and holding the lock across a network exchange would
//! stall every settings write in the meantime.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::credentials::{CredentialResolver, CredentialStore};
use crate::error::SyncError;
use crate::progress::ProgressSink;
use crate::repo::RepositoryHandle;

use super::commit;
use super::pull::{self, PullOutcome};
use super::push::{self, PushReport};

/// Lifecycle manager for one settings repository.
pub struct SyncManager {
    repo: RepositoryHandle,
    credentials: CredentialResolver,
    application_name: String,
    commit_lock: Mutex<()>,
}

impl SyncManager {
    /// Open the repository at `work_tree`, creating it if absent.
    ///
    /// `application_name` becomes the committer name on every commit this
    /// manager creates.
    pub fn new(
        work_tree: &Path,
        store: Arc<dyn CredentialStore>,
        application_name: &str,
    ) -> Result<Self, SyncError> {
        let repo = RepositoryHandle::open(work_tree)?;
        Ok(Self {
            repo,
            credentials: CredentialResolver::new(store),
            application_name: application_name.to_string(),
            commit_lock: Mutex::new(()),
        })
    }

    /// The underlying repository handle.
    pub fn repository(&self) -> &RepositoryHandle {
        &self.repo
    }

    /// Directory this manager's working tree lives in.
    pub fn work_tree(&self) -> &Path {
        self.repo.work_tree()
    }

    /// Stage one path relative to the working tree. A missing file is
    /// staged as a deletion.
    pub fn stage(&self, path: &str) -> Result<(), SyncError> {
        self.repo.stage(path)
    }

    /// Remove a path (or directory prefix) from the index.
    pub fn unstage(&self, path: &str, is_file: bool) -> Result<(), SyncError> {
        self.repo.unstage(path, is_file)
    }

    /// Point the `origin` remote at `url`, or remove it with `None`.
    pub fn set_upstream(&self, url: Option<&str>, branch: Option<&str>) -> Result<(), SyncError> {
        self.repo.set_upstream(url, branch)
    }

    /// Whether an upstream remote is configured.
    pub fn has_upstream(&self) -> bool {
        self.repo.has_upstream()
    }

    /// The configured upstream URL, if any.
    pub fn remote_url(&self) -> Option<String> {
        self.repo.remote_url()
    }

    /// Commit whatever is currently staged.
    ///
    /// Returns `Ok(None)` when the staged state matches HEAD. Serialized
    /// against every other commit on this manager.
    pub fn commit(&self, progress: &dyn ProgressSink) -> Result<Option<git2::Oid>, SyncError> {
        let _guard = self.lock_commits();
        commit::commit_staged(&self.repo, &self.application_name, progress)
    }

    /// Stage `paths` and commit them as one unit.
    ///
    /// Staging happens under the commit lock, so concurrent callers with
    /// disjoint path sets produce two commits, each containing exactly its
    /// own paths.
    pub fn commit_paths(
        &self,
        paths: &[&str],
        progress: &dyn ProgressSink,
    ) -> Result<Option<git2::Oid>, SyncError> {
        let _guard = self.lock_commits();
        for path in paths {
            self.repo.stage(path)?;
        }
        commit::commit_staged(&self.repo, &self.application_name, progress)
    }

    /// Push the local branch to every configured push URL.
    pub fn push(&self, progress: &dyn ProgressSink) -> Result<PushReport, SyncError> {
        debug!(work_tree = %self.repo.work_tree().display(), "push requested");
        push::push(&self.repo, &self.credentials, progress)
    }

    /// Fetch from the upstream remote and fast-forward the local branch.
    pub fn pull(&self, progress: &dyn ProgressSink) -> Result<PullOutcome, SyncError> {
        debug!(work_tree = %self.repo.work_tree().display(), "pull requested");
        pull::pull(&self.repo, &self.credentials, progress)
    }

    fn lock_commits(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock means a commit attempt panicked; the index is
        // still consistent, so continue rather than propagate the panic.
        self.commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("work_tree", &self.repo.work_tree())
            .field("application_name", &self.application_name)
            .finish_non_exhaustive()
    }
}
