//! repo::handle
//!
//! Repository handle implementation using git2.
//!
//! The `RepositoryHandle` owns the binding between an in-memory repository
//! and its on-disk location for the lifetime of a manager instance. It is
//! the only place the crate opens or creates repositories and mutates the
//! index; the sync coordinators build on its primitives.
//!
//! The underlying `git2::Repository` is not safe for concurrent calls, so
//! the handle keeps it behind a mutex. Every method takes the lock for the
//! duration of one call; the coordinators hold it for a whole operation
//! via [`RepositoryHandle::raw`].
//!
//! # Invariants
//!
//! - Once opened, backing store and working tree are bound 1:1; a handle
//!   is never re-pointed at a different working tree
//! - `stage`/`unstage` mutate the index only, never create commits
//! - Validity checks never mutate the inspected directory

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SyncError;

/// The default remote name all sync operations target.
pub const DEFAULT_REMOTE: &str = "origin";

/// Handle binding a git repository to a settings working tree.
///
/// Created on manager construction. If the working tree does not contain a
/// repository yet, one is created and fresh-init normalization is applied
/// (automatic line-ending conversion is disabled, so settings files round-
/// trip byte-identical across platforms).
pub struct RepositoryHandle {
    repo: Mutex<git2::Repository>,
    work_tree: PathBuf,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("work_tree", &self.work_tree)
            .finish()
    }
}

impl RepositoryHandle {
    /// Open the repository bound to `work_tree`, creating it if absent.
    ///
    /// A fresh repository gets `core.autocrlf = false` so checked-out
    /// settings files are not rewritten per platform.
    ///
    /// # Errors
    ///
    /// [`SyncError::Initialization`] if the backing store cannot be
    /// created or opened (permissions, corruption). This failure is
    /// terminal for the manager being constructed.
    pub fn open(work_tree: &Path) -> Result<Self, SyncError> {
        let repo = if work_tree.join(".git").exists() {
            git2::Repository::open(work_tree).map_err(|e| SyncError::init(&e))?
        } else {
            let repo = git2::Repository::init(work_tree).map_err(|e| SyncError::init(&e))?;
            let mut config = repo.config().map_err(|e| SyncError::init(&e))?;
            config
                .set_str("core.autocrlf", "false")
                .map_err(|e| SyncError::init(&e))?;
            repo
        };

        Ok(Self {
            repo: Mutex::new(repo),
            work_tree: work_tree.to_path_buf(),
        })
    }

    /// Create a bare repository at `dir` (remote side or headless init).
    ///
    /// # Errors
    ///
    /// [`SyncError::Initialization`] on I/O failure.
    pub fn init_bare(dir: &Path) -> Result<(), SyncError> {
        git2::Repository::init_bare(dir).map_err(|e| SyncError::init(&e))?;
        Ok(())
    }

    /// Whether `dir` is a usable repository.
    ///
    /// True for a working copy (`.git` marker present) or for a directory
    /// that opens as an existing bare repository. Open failures are
    /// swallowed as "not a repository", never propagated.
    pub fn is_valid_repository(dir: &Path) -> bool {
        if dir.join(".git").exists() {
            return true;
        }
        // existing bare repository
        git2::Repository::open_bare(dir).is_ok()
    }

    /// The working tree root this handle is bound to.
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Lock the underlying repository for the sync coordinators.
    ///
    /// Callers must not invoke other handle methods while the guard is
    /// alive; those methods take the same lock.
    pub(crate) fn raw(&self) -> MutexGuard<'_, git2::Repository> {
        // A poisoned lock means a caller panicked mid-call; the on-disk
        // state is still consistent, so continue.
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Index Mutation
    // =========================================================================

    /// Stage a single path (relative to the working tree root).
    ///
    /// If the file no longer exists in the working tree, its deletion is
    /// staged instead. Re-staging an unchanged path has no effect.
    pub fn stage(&self, path: &str) -> Result<(), SyncError> {
        let repo = self.raw();
        let mut index = repo.index()?;
        if self.work_tree.join(path).exists() {
            index.add_path(Path::new(path))?;
        } else {
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        Ok(())
    }

    /// Remove a path from the index.
    ///
    /// `is_file` selects between a single entry and a directory subtree.
    pub fn unstage(&self, path: &str, is_file: bool) -> Result<(), SyncError> {
        let repo = self.raw();
        let mut index = repo.index()?;
        if is_file {
            index.remove_path(Path::new(path))?;
        } else {
            index.remove_dir(Path::new(path), 0)?;
        }
        index.write()?;
        Ok(())
    }

    // =========================================================================
    // Upstream Configuration
    // =========================================================================

    /// URL of the default remote, if one is configured.
    pub fn remote_url(&self) -> Option<String> {
        let repo = self.raw();
        let config = repo.config().ok()?;
        let url = config
            .get_string(&format!("remote.{}.url", DEFAULT_REMOTE))
            .ok()?;
        let url = url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        }
    }

    /// Whether a default remote URL is configured.
    pub fn has_upstream(&self) -> bool {
        self.remote_url().is_some()
    }

    /// Point the default remote at `url`, or remove it when `url` is None.
    ///
    /// Also records the tracking configuration for `branch` (defaulting to
    /// the current branch, falling back to `master`) so pulls know what to
    /// merge.
    pub fn set_upstream(&self, url: Option<&str>, branch: Option<&str>) -> Result<(), SyncError> {
        // Resolved before taking the lock; head_leaf_ref locks too.
        let branch = match branch {
            Some(name) => Some(name.trim_start_matches("refs/heads/").to_string()),
            None => self
                .head_leaf_ref()?
                .map(|leaf| leaf.trim_start_matches("refs/heads/").to_string()),
        };

        let repo = self.raw();
        match url {
            Some(url) => {
                if repo.find_remote(DEFAULT_REMOTE).is_ok() {
                    repo.remote_set_url(DEFAULT_REMOTE, url)?;
                } else {
                    repo.remote(DEFAULT_REMOTE, url)?;
                }

                let branch = branch.unwrap_or_else(|| "master".to_string());
                let mut config = repo.config()?;
                config.set_str(&format!("branch.{}.remote", branch), DEFAULT_REMOTE)?;
                config.set_str(
                    &format!("branch.{}.merge", branch),
                    &format!("refs/heads/{}", branch),
                )?;
            }
            None => {
                if repo.find_remote(DEFAULT_REMOTE).is_ok() {
                    repo.remote_delete(DEFAULT_REMOTE)?;
                }

                // remote_delete leaves branch.<name>.{remote,merge} behind.
                let mut config = repo.config()?;
                let mut stale = Vec::new();
                {
                    let mut entries = config.entries(Some("branch\\..*\\.remote"))?;
                    while let Some(entry) = entries.next() {
                        let entry = entry?;
                        if entry.value() == Some(DEFAULT_REMOTE) {
                            if let Some(name) = entry.name() {
                                stale.push(name.to_string());
                            }
                        }
                    }
                }
                for remote_key in stale {
                    let merge_key = format!(
                        "{}.merge",
                        remote_key.strip_suffix(".remote").unwrap_or(&remote_key)
                    );
                    remove_config_key(&mut config, &remote_key)?;
                    remove_config_key(&mut config, &merge_key)?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Read Primitives for the Coordinators
    // =========================================================================

    /// The leaf ref name a symbolic HEAD ultimately points at.
    ///
    /// Returns `None` when HEAD is detached or missing. The leaf may be an
    /// unborn branch (named but not yet created), which is still a valid
    /// push target name.
    pub fn head_leaf_ref(&self) -> Result<Option<String>, SyncError> {
        let repo = self.raw();
        let head = match repo.find_reference("HEAD") {
            Ok(head) => head,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.kind() != Some(git2::ReferenceType::Symbolic) {
            return Ok(None);
        }

        let mut current = head;
        loop {
            let target = match current.symbolic_target() {
                Some(target) => target.to_string(),
                None => return Ok(current.name().map(str::to_string)),
            };
            match repo.find_reference(&target) {
                Ok(next) if next.kind() == Some(git2::ReferenceType::Symbolic) => current = next,
                // Concrete ref, or an unborn branch that only exists by name
                Ok(_) | Err(_) => return Ok(Some(target)),
            }
        }
    }

    /// Push refspecs configured for the default remote.
    pub fn configured_push_refspecs(&self) -> Result<Vec<String>, SyncError> {
        self.config_multivar(&format!("remote.{}.push", DEFAULT_REMOTE))
    }

    /// URLs a push to the default remote must reach.
    ///
    /// Dedicated push URLs take precedence; otherwise the fetch URLs are
    /// used. A remote may carry several of either.
    pub fn push_urls(&self) -> Result<Vec<String>, SyncError> {
        let push_urls = self.config_multivar(&format!("remote.{}.pushurl", DEFAULT_REMOTE))?;
        if !push_urls.is_empty() {
            return Ok(push_urls);
        }
        self.config_multivar(&format!("remote.{}.url", DEFAULT_REMOTE))
    }

    /// Author identity from repository/global config, with a neutral
    /// fallback when the user never configured one.
    pub(crate) fn author(&self) -> Result<git2::Signature<'static>, SyncError> {
        self.raw()
            .signature()
            .or_else(|_| git2::Signature::now("user", "user@localhost"))
            .map_err(SyncError::from)
    }

    fn config_multivar(&self, name: &str) -> Result<Vec<String>, SyncError> {
        let repo = self.raw();
        let config = repo.config()?;
        let mut values = Vec::new();
        match config.multivar(name, None) {
            Ok(mut entries) => {
                while let Some(entry) = entries.next() {
                    let entry = entry?;
                    if let Some(value) = entry.value() {
                        values.push(value.to_string());
                    }
                }
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(values)
    }
}

/// Remove a config key, treating an already-absent key as success.
fn remove_config_key(config: &mut git2::Config, key: &str) -> Result<(), SyncError> {
    match config.remove(key) {
        Ok(()) => Ok(()),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
