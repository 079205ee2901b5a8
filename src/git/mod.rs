//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the repository. Engines talk to
//! a [`GitPort`]; no other module imports `git2` or spawns `git`.
//!
//! - [`Git`]: production port (`git2` for reads, the `git` CLI for writes)
//! - [`mock::MockGit`]: recording port for tests
//! - [`ProcessRunner`]: child process execution with a timeout
//!
//! # Invariants
//!
//! - Every child process runs in the repository's work tree
//! - Every child process is bounded by a wall-clock timeout
//! - Pushes take a [`crate::core::types::RefSpec`], so a push never deletes
//!   a remote branch

mod interface;
pub mod mock;
mod runner;
mod traits;

pub use interface::{with_commit_log, Git, GitError, GitState, WorktreeStatus};
pub use runner::ProcessRunner;
pub use traits::GitPort;
