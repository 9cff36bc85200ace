//! sync
//!
//! Commit, push, and pull orchestration for one settings repository.
//!
//! # Architecture
//!
//! [`SyncManager`] is the host-facing surface. It delegates to three
//! coordinators, each in its own submodule:
//!
//! - `commit` - builds commits from the staged index state
//! - `push` - one transport per configured push URL, per-ref report
//! - `pull` - fetch plus fast-forward-only integration
//!
//! # Concurrency
//!
//! Commit construction is serialized by a single per-manager lock, and
//! `commit_paths` stages inside that lock so stage-and-commit is atomic.
//! Push and pull run outside the commit lock; the host sequences them
//! against commits, and the handle serializes individual repository calls
//! internally. Transports are released on every path, success or failure.

mod commit;
mod manager;
mod pull;
mod push;
mod transport;

pub use manager::SyncManager;
pub use pull::PullOutcome;
pub use push::{PushReport, RefUpdate, RefUpdateStatus};

pub use crate::error::{SyncError, SyncOperation};
