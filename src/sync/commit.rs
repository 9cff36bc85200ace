//! sync::commit
//!
//! Commit construction from the staged index state.
//!
//! A commit captures exactly the net staged state at commit time. The
//! author identity comes from local git config; the committer is the host
//! application, carrying the author's contact address. Serialization of
//! concurrent commit attempts is the manager's job - everything here runs
//! under its commit lock.

use tracing::debug;

use crate::error::SyncError;
use crate::progress::ProgressSink;
use crate::repo::RepositoryHandle;

/// Build one commit from the currently staged changes.
///
/// Returns `Ok(None)` when nothing is staged - an empty commit is never
/// created. The commit message summarizes the changed paths.
pub(crate) fn commit_staged(
    handle: &RepositoryHandle,
    application_name: &str,
    progress: &dyn ProgressSink,
) -> Result<Option<git2::Oid>, SyncError> {
    // Resolved before the repository lock; author() takes the same lock.
    let author = handle.author()?;

    let repo = handle.raw();

    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) if e.code() == git2::ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let changed = changed_paths(&repo, parent.as_ref(), &tree)?;
    if changed.is_empty() {
        debug!("commit skipped: nothing staged");
        return Ok(None);
    }

    let message = summarize(&changed);
    progress.report(&format!("committing {}", message));

    let committer = git2::Signature::now(
        application_name,
        author.email().unwrap_or("user@localhost"),
    )?;

    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &author, &committer, &message, &tree, &parents)?;

    debug!(commit = %oid, changes = changed.len(), "created commit");
    Ok(Some(oid))
}

/// Paths that differ between the parent commit's tree and the new tree.
///
/// With no parent (unborn HEAD) every index entry counts as changed.
fn changed_paths(
    repo: &git2::Repository,
    parent: Option<&git2::Commit>,
    tree: &git2::Tree,
) -> Result<Vec<String>, SyncError> {
    let parent_tree = match parent {
        Some(commit) => Some(commit.tree()?),
        None => None,
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(tree), None)?;
    let mut paths = Vec::new();
    for delta in diff.deltas() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned());
        if let Some(path) = path {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// Commit message for a set of changed paths: the first few names, with a
/// count for the rest.
fn summarize(paths: &[String]) -> String {
    const SHOWN: usize = 3;

    let shown = paths
        .iter()
        .take(SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    if paths.len() > SHOWN {
        format!("{} (+{} more)", shown, paths.len() - SHOWN)
    } else {
        shown
    }
}
