//! engine::sync
//!
//! Reconcile a local branch with a source remote branch and republish it to
//! a destination remote branch.
//!
//! # Algorithm
//!
//! 1. Preconditions: clean tree, local branch exists, source remote branch
//!    exists, push flags consistent. Nothing is mutated if one fails.
//! 2. Update the source and destination remotes.
//! 3. Compute [`SyncStatus`] of `local` against `source`.
//! 4. Act:
//!
//! | status | Force | Smart / SmartMerge |
//! |---|---|---|
//! | UpToDate | nothing | nothing |
//! | NeedPull | reset --hard | rebase / merge |
//! | Diverged | reset --hard | rebase / merge, then push |
//! | NeedPush | reset --hard | push |
//!
//! `Force` never pushes. Pushes honor `DISABLE_PUSH` and `FORCE_PUSH`.
//! Every push goes through a [`RefSpec`], so its local side is never empty.
//!
//! The branch checked out before the sync is restored afterwards.

use crate::core::types::{BranchName, RefSpec, RemoteRef, SyncOptions, SyncStatus, SyncStrategy};
use crate::git::GitPort;

use super::guard::BranchGuard;
use super::rebase::RebaseExecutor;
use super::EngineError;

/// What a sync did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Nothing,
    Reset,
    Rebased,
    Merged,
    PushOnly,
}

/// Result of [`BranchSyncEngine::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Status before any change
    pub status: SyncStatus,
    pub action: SyncAction,
    /// Whether anything was pushed to the destination
    pub pushed: bool,
}

/// Branch synchronization.
///
/// # Example
///
/// ```
/// use gitferry::core::types::{BranchName, SyncOptions, SyncStatus, SyncStrategy};
/// use gitferry::engine::{BranchSyncEngine, SyncAction};
/// use gitferry::git::mock::MockGit;
///
/// let git = MockGit::new().with_current_branch("dev").with_status(SyncStatus::NeedPush);
/// let local = BranchName::new("dev").unwrap();
///
/// let outcome = BranchSyncEngine::new(&git, local)
///     .sync(SyncStrategy::Smart, SyncOptions::empty())
///     .unwrap();
///
/// assert_eq!(outcome.action, SyncAction::PushOnly);
/// assert_eq!(git.pushes(), vec![("origin".into(), "dev:dev".into(), false)]);
/// ```
#[derive(Debug)]
pub struct BranchSyncEngine<'g, G: GitPort + ?Sized> {
    git: &'g G,
    local: BranchName,
    source: Option<RemoteRef>,
    destination: Option<RemoteRef>,
}

/// Remote pulled from unless configured otherwise.
pub const DEFAULT_SOURCE_REMOTE: &str = "upstream";
/// Remote published to unless configured otherwise.
pub const DEFAULT_DEST_REMOTE: &str = "origin";

impl<'g, G: GitPort + ?Sized> BranchSyncEngine<'g, G> {
    /// Sync `local` from `upstream/<local>` to `origin/<local>`.
    pub fn new(git: &'g G, local: BranchName) -> Self {
        Self {
            git,
            local,
            source: None,
            destination: None,
        }
    }

    pub fn source(mut self, source: RemoteRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn destination(mut self, destination: RemoteRef) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn sync(
        self,
        strategy: SyncStrategy,
        options: SyncOptions,
    ) -> Result<SyncOutcome, EngineError> {
        let git = self.git;
        let local = self.local.as_str();
        let source = match self.source {
            Some(source) => source,
            None => RemoteRef::new(DEFAULT_SOURCE_REMOTE, self.local.clone())?,
        };
        let destination = match self.destination {
            Some(destination) => destination,
            None => RemoteRef::new(DEFAULT_DEST_REMOTE, self.local.clone())?,
        };

        let options = options.validate()?;
        git.guard_working_tree_ready()?;
        git.guard_branch_exists(local)?;
        git.guard_remote_branch_exists(source.remote(), source.branch().as_str())?;

        git.remote_update(source.remote())?;
        if destination.remote() != source.remote() {
            git.remote_update(destination.remote())?;
        }

        let status = git.remote_diff_status(source.remote(), local, source.branch().as_str())?;
        tracing::debug!(local, source = %source, %status, ?strategy, "sync status");

        if status == SyncStatus::UpToDate {
            return Ok(SyncOutcome {
                status,
                action: SyncAction::Nothing,
                pushed: false,
            });
        }

        let guard = BranchGuard::acquire(git, false)?;
        let tracking = source.tracking();

        let (action, push) = match (strategy, status) {
            (SyncStrategy::Force, _) => {
                git.checkout(local, false)?;
                git.reset_hard(&tracking)?;
                (SyncAction::Reset, false)
            }
            (_, SyncStatus::NeedPush) => (SyncAction::PushOnly, true),
            (SyncStrategy::Smart, _) => {
                git.checkout(local, false)?;
                RebaseExecutor::new(git, tracking.as_str()).perform()?;
                (SyncAction::Rebased, status == SyncStatus::Diverged)
            }
            (SyncStrategy::SmartMerge, _) => {
                let message = format!("Merge remote-tracking branch '{}' into {}", tracking, local);
                if let Err(e) = git.merge_branch(local, &tracking, &message, false) {
                    if let Err(abort) = git.run_command(&["merge", "--abort"]) {
                        tracing::warn!(error = %abort, "merge --abort failed");
                    }
                    return Err(e.into());
                }
                (SyncAction::Merged, status == SyncStatus::Diverged)
            }
        };

        let pushed = push && !options.contains(SyncOptions::DISABLE_PUSH);
        if pushed {
            let refspec = RefSpec::new(local, destination.branch().as_str())?;
            git.push_to_remote(
                destination.remote(),
                &refspec,
                options.contains(SyncOptions::FORCE_PUSH),
            )?;
        }
        guard.release()?;

        tracing::info!(local, %status, ?action, pushed, "synced");
        Ok(SyncOutcome {
            status,
            action,
            pushed,
        })
    }
}
