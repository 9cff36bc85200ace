//! Integration tests for the sync lifecycle.
//!
//! These tests drive real repositories created via tempfile, with a local
//! bare repository standing in for the upstream, and verify results
//! against the git CLI where that is the most direct oracle.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use settings_sync::credentials::MemoryCredentialStore;
use settings_sync::progress::{RecordingProgress, SilentProgress};
use settings_sync::repo::RepositoryHandle;
use settings_sync::sync::{PullOutcome, RefUpdateStatus, SyncManager};
use settings_sync::SyncError;

/// Test fixture holding a settings working tree and a bare upstream.
struct SyncFixture {
    dir: TempDir,
}

impl SyncFixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn work_tree(&self) -> PathBuf {
        self.dir.path().join("settings")
    }

    /// Path of the shared bare upstream, created on first use.
    fn bare_remote(&self) -> PathBuf {
        let path = self.dir.path().join("remote.git");
        if !path.exists() {
            RepositoryHandle::init_bare(&path).expect("init bare remote");
        }
        path
    }

    /// Open a manager on the default working tree.
    fn manager(&self) -> SyncManager {
        open_manager(&self.work_tree())
    }

    /// Open a manager on a second, independent working tree.
    fn second_manager(&self) -> SyncManager {
        open_manager(&self.dir.path().join("settings-b"))
    }
}

/// Open a manager and pin the branch name so assertions are deterministic.
fn open_manager(work_tree: &Path) -> SyncManager {
    let manager = SyncManager::new(
        work_tree,
        Arc::new(MemoryCredentialStore::new()),
        "TestApp",
    )
    .expect("open manager");
    run_git(work_tree, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(work_tree, &["config", "user.email", "test@example.com"]);
    run_git(work_tree, &["config", "user.name", "Test User"]);
    manager
}

fn write_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn commit_file(manager: &SyncManager, name: &str, content: &str) -> git2::Oid {
    write_file(manager.work_tree(), name, content);
    manager.stage(name).expect("stage");
    manager
        .commit(&SilentProgress)
        .expect("commit")
        .expect("created a commit")
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Run a git command and capture stdout.
fn run_git_out(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

// =============================================================================
// Commit Lifecycle
// =============================================================================

#[test]
fn commit_reflects_net_staged_state() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();

    write_file(manager.work_tree(), "keep.toml", "a = 1\n");
    write_file(manager.work_tree(), "drop.toml", "b = 2\n");
    manager.stage("keep.toml").expect("stage");
    manager.stage("drop.toml").expect("stage");
    manager.unstage("drop.toml", true).expect("unstage");

    manager
        .commit(&SilentProgress)
        .expect("commit")
        .expect("created a commit");

    let listed = run_git_out(manager.work_tree(), &["ls-tree", "--name-only", "HEAD"]);
    assert!(listed.contains("keep.toml"));
    assert!(!listed.contains("drop.toml"));
}

#[test]
fn reopening_binds_the_same_history() {
    let fixture = SyncFixture::new();
    {
        let manager = fixture.manager();
        commit_file(&manager, "keymap.toml", "a = 1\n");
    }

    let manager = fixture.manager();
    assert_eq!(
        run_git_out(manager.work_tree(), &["rev-list", "--count", "HEAD"]),
        "1"
    );
}

#[test]
fn concurrent_commits_with_disjoint_paths_serialize() {
    let fixture = SyncFixture::new();
    let manager = Arc::new(fixture.manager());

    let mut workers = Vec::new();
    for name in ["left.toml", "right.toml"] {
        let manager = Arc::clone(&manager);
        workers.push(thread::spawn(move || {
            write_file(manager.work_tree(), name, "x = 1\n");
            manager
                .commit_paths(&[name], &SilentProgress)
                .expect("commit")
                .expect("created a commit")
        }));
    }
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    // Two commits, each capturing exactly its own path set.
    assert_eq!(
        run_git_out(manager.work_tree(), &["rev-list", "--count", "HEAD"]),
        "2"
    );
    let listed = run_git_out(manager.work_tree(), &["ls-tree", "--name-only", "HEAD"]);
    assert!(listed.contains("left.toml"));
    assert!(listed.contains("right.toml"));
}

#[test]
fn commit_reports_progress() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();

    write_file(manager.work_tree(), "keymap.toml", "a = 1\n");
    manager.stage("keymap.toml").expect("stage");

    let progress = RecordingProgress::new();
    manager.commit(&progress).expect("commit");

    let messages = progress.messages();
    assert!(messages.iter().any(|m| m.contains("keymap.toml")));
}

// =============================================================================
// Push
// =============================================================================

#[test]
fn push_without_upstream_is_a_noop() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    commit_file(&manager, "keymap.toml", "a = 1\n");

    let report = manager.push(&SilentProgress).expect("push");
    assert!(report.updates.is_empty());
}

#[test]
fn push_advances_the_bare_upstream() -> anyhow::Result<()> {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    let head = commit_file(&manager, "keymap.toml", "a = 1\n");

    let bare = fixture.bare_remote();
    manager.set_upstream(Some(bare.to_str().unwrap()), Some("main"))?;

    let report = manager.push(&SilentProgress)?;
    assert!(report.rejected().next().is_none());

    let remote_head = run_git_out(
        fixture.dir.path(),
        &[
            "--git-dir",
            bare.to_str().unwrap(),
            "rev-parse",
            "refs/heads/main",
        ],
    );
    assert_eq!(remote_head, head.to_string());
    Ok(())
}

#[test]
fn repeated_push_reports_up_to_date() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    commit_file(&manager, "keymap.toml", "a = 1\n");

    let bare = fixture.bare_remote();
    manager
        .set_upstream(Some(bare.to_str().unwrap()), Some("main"))
        .expect("set upstream");

    // First push sends the commit and the remote accepts the ref.
    let first = manager.push(&SilentProgress).expect("first push");
    assert_eq!(first.updates.len(), 1);
    assert_eq!(first.updates[0].refname, "refs/heads/main");
    assert_eq!(first.updates[0].status, RefUpdateStatus::Accepted);

    // The remote is already at this commit; nothing is sent again.
    let second = manager.push(&SilentProgress).expect("second push");
    assert_eq!(second.updates.len(), 1);
    assert_eq!(second.updates[0].refname, "refs/heads/main");
    assert_eq!(second.updates[0].status, RefUpdateStatus::UpToDate);

    // A new commit flips the same ref back to an accepted update.
    commit_file(&manager, "editor.toml", "tabs = 4\n");
    let third = manager.push(&SilentProgress).expect("third push");
    assert_eq!(third.updates.len(), 1);
    assert_eq!(third.updates[0].status, RefUpdateStatus::Accepted);
}

#[test]
fn push_failure_leaves_the_manager_usable() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    commit_file(&manager, "keymap.toml", "a = 1\n");

    let missing = fixture.dir.path().join("missing.git");
    manager
        .set_upstream(Some(missing.to_str().unwrap()), Some("main"))
        .expect("set upstream");

    let err = manager.push(&SilentProgress).unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }));

    // Transport released; repointing and retrying succeeds.
    let bare = fixture.bare_remote();
    manager
        .set_upstream(Some(bare.to_str().unwrap()), Some("main"))
        .expect("repoint upstream");
    manager.push(&SilentProgress).expect("push after failure");
}

#[test]
fn cancelled_push_never_opens_a_transport() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    commit_file(&manager, "keymap.toml", "a = 1\n");

    let bare = fixture.bare_remote();
    manager
        .set_upstream(Some(bare.to_str().unwrap()), Some("main"))
        .expect("set upstream");

    let progress = RecordingProgress::new();
    progress.cancel();
    let err = manager.push(&progress).unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));

    let refs = run_git_out(
        fixture.dir.path(),
        &["--git-dir", bare.to_str().unwrap(), "for-each-ref"],
    );
    assert!(refs.is_empty());
}

// =============================================================================
// Pull
// =============================================================================

#[test]
fn pull_without_upstream_is_up_to_date() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();

    let outcome = manager.pull(&SilentProgress).expect("pull");
    assert_eq!(outcome, PullOutcome::UpToDate);
}

#[test]
fn pull_fast_forwards_a_fresh_replica() -> anyhow::Result<()> {
    let fixture = SyncFixture::new();
    let bare = fixture.bare_remote();
    let url = bare.to_str().unwrap().to_string();

    let source = fixture.manager();
    let head = commit_file(&source, "keymap.toml", "a = 1\n");
    source.set_upstream(Some(&url), Some("main"))?;
    source.push(&SilentProgress)?;

    let replica = fixture.second_manager();
    replica.set_upstream(Some(&url), Some("main"))?;

    let outcome = replica.pull(&SilentProgress)?;
    assert_eq!(outcome, PullOutcome::FastForwarded { commit: head });

    let content = std::fs::read_to_string(replica.work_tree().join("keymap.toml"))?;
    assert_eq!(content, "a = 1\n");
    Ok(())
}

#[test]
fn pull_when_current_is_up_to_date() {
    let fixture = SyncFixture::new();
    let bare = fixture.bare_remote();
    let url = bare.to_str().unwrap().to_string();

    let source = fixture.manager();
    commit_file(&source, "keymap.toml", "a = 1\n");
    source
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");
    source.push(&SilentProgress).expect("push");

    let replica = fixture.second_manager();
    replica
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");
    replica.pull(&SilentProgress).expect("first pull");

    let outcome = replica.pull(&SilentProgress).expect("second pull");
    assert_eq!(outcome, PullOutcome::UpToDate);
}

#[test]
fn pull_of_diverged_histories_is_a_conflict() {
    let fixture = SyncFixture::new();
    let bare = fixture.bare_remote();
    let url = bare.to_str().unwrap().to_string();

    let source = fixture.manager();
    commit_file(&source, "shared.toml", "v = 1\n");
    source
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");
    source.push(&SilentProgress).expect("push");

    let replica = fixture.second_manager();
    replica
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");
    replica.pull(&SilentProgress).expect("initial pull");

    // Both sides advance independently.
    commit_file(&source, "from-source.toml", "s = 1\n");
    source.push(&SilentProgress).expect("push divergence");
    commit_file(&replica, "from-replica.toml", "r = 1\n");

    let err = replica.pull(&SilentProgress).unwrap_err();
    assert!(matches!(err, SyncError::Conflict { .. }));

    // Local state is untouched by the failed integration.
    let content =
        std::fs::read_to_string(replica.work_tree().join("from-replica.toml")).unwrap();
    assert_eq!(content, "r = 1\n");
    assert!(!replica.work_tree().join("from-source.toml").exists());
}

#[test]
fn pull_failure_mid_exchange_leaves_manager_usable() {
    let fixture = SyncFixture::new();
    let bare = fixture.bare_remote();
    let url = bare.to_str().unwrap().to_string();

    let source = fixture.manager();
    commit_file(&source, "keymap.toml", "a = 1\n");
    source
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");
    source.push(&SilentProgress).expect("push");

    // Gut the remote's object store. Its refs still advertise the pushed
    // commit, so a fetch connects successfully and then fails while
    // assembling the pack.
    std::fs::remove_dir_all(bare.join("objects")).unwrap();
    std::fs::create_dir_all(bare.join("objects").join("info")).unwrap();
    std::fs::create_dir_all(bare.join("objects").join("pack")).unwrap();

    let replica = fixture.second_manager();
    replica
        .set_upstream(Some(&url), Some("main"))
        .expect("set upstream");

    let err = replica.pull(&SilentProgress).unwrap_err();
    assert!(!matches!(err, SyncError::Conflict { .. }));

    // Both managers keep working once a healthy upstream exists.
    let good = fixture.dir.path().join("good.git");
    RepositoryHandle::init_bare(&good).expect("init bare");
    let good_url = good.to_str().unwrap().to_string();

    source
        .set_upstream(Some(&good_url), Some("main"))
        .expect("repoint source");
    source.push(&SilentProgress).expect("push after failure");

    replica
        .set_upstream(Some(&good_url), Some("main"))
        .expect("repoint replica");
    let outcome = replica.pull(&SilentProgress).expect("pull after failure");
    assert!(matches!(outcome, PullOutcome::FastForwarded { .. }));
}

// =============================================================================
// Validity
// =============================================================================

#[test]
fn managed_work_tree_is_a_valid_repository() {
    let fixture = SyncFixture::new();
    let manager = fixture.manager();
    assert!(RepositoryHandle::is_valid_repository(manager.work_tree()));
    assert!(RepositoryHandle::is_valid_repository(&fixture.bare_remote()));
    assert!(!RepositoryHandle::is_valid_repository(fixture.dir.path()));
}
