//! repo
//!
//! Single interface for git operations on the local repository.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the repository's backing store.
//! Opening and creating repositories, index mutation, and the config reads
//! the coordinators depend on all flow through [`RepositoryHandle`]. Only
//! this module and the `sync` coordinators (which need transport callbacks)
//! touch `git2` directly.

mod handle;

pub use handle::{RepositoryHandle, DEFAULT_REMOTE};
