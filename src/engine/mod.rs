//! engine
//!
//! Orchestration of multi-step Git workflows over a [`GitPort`].
//!
//! # Architecture
//!
//! Each operation is a single-use value:
//!
//! ```text
//! Builder -> perform(self) -> Completed -> push(self)
//! ```
//!
//! - [`BranchSyncEngine`]: reconcile a local branch with its remotes
//! - [`MergeOrchestrator`]: merge one remote branch into another through
//!   staging branches
//! - [`PatchApplier`]: apply a patch to a remote branch through a staging
//!   branch
//! - [`RebaseExecutor`]: one rebase, aborted if it fails
//!
//! # Invariants
//!
//! - Performing consumes the operation; a second perform does not compile
//! - Only a completed operation can push
//! - Pushes use a [`crate::core::types::RefSpec`], never an empty local side
//! - The branch checked out at the start is restored on every exit path
//!   ([`BranchGuard`])
//!
//! [`GitPort`]: crate::git::GitPort

mod error;
pub mod guard;
pub mod merge;
pub mod patch;
pub mod rebase;
pub mod sync;

use std::path::PathBuf;

pub use error::EngineError;
pub use guard::{BranchGuard, OriginalHead};
pub use merge::{MergeCompleted, MergeMessage, MergeOrchestrator, MergeSpec};
pub use patch::{PatchApplied, PatchApplier};
pub use rebase::RebaseExecutor;
pub use sync::{BranchSyncEngine, SyncAction, SyncOutcome};

use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Directory the repository is discovered from.
    pub fn work_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
