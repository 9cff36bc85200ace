//! settings-sync - Git-backed synchronization for a settings working tree
//!
//! This library keeps a directory of user configuration files in sync with a
//! remote git repository, so a host application (an editor or IDE) can
//! persist and share settings across machines without the user ever touching
//! version control directly.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`sync`] - The manager: commit, push, and pull orchestration
//! - [`repo`] - Single interface for git operations on the local repository
//! - [`credentials`] - Credential storage abstraction and per-manager resolver
//! - [`progress`] - Progress reporting and cooperative cancellation
//!
//! # Correctness Invariants
//!
//! 1. Commit construction is serialized by a single per-manager lock
//! 2. Transports are released on every push/pull path, success or failure
//! 3. Pull never overwrites local state: fast-forward or surface a conflict
//! 4. Credentials are resolved lazily, cached for the manager's lifetime,
//!    and never logged
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use settings_sync::credentials::FileCredentialStore;
//! use settings_sync::progress::SilentProgress;
//! use settings_sync::sync::SyncManager;
//!
//! let store = Arc::new(FileCredentialStore::new()?);
//! let manager = SyncManager::new("/home/user/.config/app".as_ref(), store, "MyApp")?;
//!
//! manager.stage("keymap.toml")?;
//! manager.commit(&SilentProgress)?;
//! manager.push(&SilentProgress)?;
//! ```

pub mod credentials;
pub mod error;
pub mod progress;
pub mod repo;
pub mod sync;

pub use credentials::{CredentialError, CredentialStore, Credentials};
pub use error::{SyncError, SyncOperation};
pub use progress::ProgressSink;
pub use repo::RepositoryHandle;
pub use sync::{PullOutcome, PushReport, SyncManager};
