//! engine::merge
//!
//! Merge a source remote branch into a target remote branch through local
//! staging branches, then publish the result.
//!
//! # Algorithm
//!
//! 1. Refuse a dirty working tree, remember the checked-out branch
//!    ([`BranchGuard`]) and update both remotes.
//! 2. Stage the target: check out `target` (or `remote/<switch_base>`) and
//!    branch a staging branch from it.
//! 3. Stage the source the same way. With a switch base, transplant the
//!    source commits from the old target onto the new base; the switch base
//!    is the effective target from here on.
//! 4. Drift check: if the target tip is not the fork point of the two
//!    staging branches, the target moved since the source forked. Then
//!    [`Realignment`] decides: rebase the source onto the target, refuse,
//!    or carry on.
//! 5. Optionally squash the source commits.
//! 6. Resolve the message ([`MergeMessage`]).
//! 7. Merge: fast-forward only, or a merge commit (optionally with a
//!    commit summary).
//! 8. Restore the original branch.
//!
//! [`MergeCompleted::push`] then publishes `<target staging>:<target>`.
//!
//! # One-shot
//!
//! [`MergeOrchestrator::perform`] consumes the orchestrator, so it cannot be
//! performed twice:
//!
//! ```compile_fail
//! use gitferry::core::types::RemoteRef;
//! use gitferry::engine::MergeOrchestrator;
//! use gitferry::git::mock::MockGit;
//!
//! let git = MockGit::new();
//! let source = RemoteRef::parse("upstream", "1.0").unwrap();
//! let target = RemoteRef::parse("upstream", "2.0").unwrap();
//! let merge = MergeOrchestrator::new(&git, source, target);
//! let _ = merge.perform();
//! let _ = merge.perform();
//! ```

use std::fmt;

use crate::core::types::{BranchName, Oid, RefSpec, Realignment, RemoteRef};
use crate::git::{GitError, GitPort};

use super::guard::{delete_staging_branch, BranchGuard};
use super::rebase::RebaseExecutor;
use super::EngineError;

/// Builds a message from `(target, source)` branch names.
pub type MessageTemplate = Box<dyn Fn(&str, &str) -> String>;

/// A merge commit message, fixed or resolved at merge time.
pub enum MergeMessage {
    Literal(String),
    Deferred(MessageTemplate),
}

impl MergeMessage {
    /// A message computed from the final target and source branch names.
    pub fn deferred(f: impl Fn(&str, &str) -> String + 'static) -> Self {
        MergeMessage::Deferred(Box::new(f))
    }

    /// `Merge branch '<source>' into '<target>'`.
    pub fn standard() -> Self {
        Self::deferred(|target, source| format!("Merge branch '{}' into '{}'", source, target))
    }

    pub fn resolve(&self, target: &str, source: &str) -> String {
        match self {
            MergeMessage::Literal(text) => text.clone(),
            MergeMessage::Deferred(f) => f(target, source),
        }
    }
}

impl Default for MergeMessage {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for MergeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMessage::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            MergeMessage::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<String> for MergeMessage {
    fn from(text: String) -> Self {
        MergeMessage::Literal(text)
    }
}

impl From<&str> for MergeMessage {
    fn from(text: &str) -> Self {
        MergeMessage::Literal(text.to_string())
    }
}

/// Everything a merge needs to know.
#[derive(Debug)]
pub struct MergeSpec {
    pub source: RemoteRef,
    pub target: RemoteRef,
    pub switch_base: Option<BranchName>,
    pub squash: bool,
    pub force_squash: bool,
    pub message: MergeMessage,
    pub append_log: bool,
    pub fast_forward: bool,
    pub realignment: Realignment,
    pub keep_temp_branches: bool,
}

impl MergeSpec {
    pub fn new(source: RemoteRef, target: RemoteRef) -> Self {
        Self {
            source,
            target,
            switch_base: None,
            squash: false,
            force_squash: false,
            message: MergeMessage::default(),
            append_log: false,
            fast_forward: false,
            realignment: Realignment::default(),
            keep_temp_branches: false,
        }
    }
}

/// Pending merge.
#[derive(Debug)]
pub struct MergeOrchestrator<'g, G: GitPort + ?Sized> {
    git: &'g G,
    spec: MergeSpec,
}

impl<'g, G: GitPort + ?Sized> MergeOrchestrator<'g, G> {
    pub fn new(git: &'g G, source: RemoteRef, target: RemoteRef) -> Self {
        Self::from_spec(git, MergeSpec::new(source, target))
    }

    pub fn from_spec(git: &'g G, spec: MergeSpec) -> Self {
        Self { git, spec }
    }

    /// Merge into `switch_base` instead, moving the source commits onto it.
    pub fn switch_base(mut self, base: Option<BranchName>) -> Self {
        self.spec.switch_base = base;
        self
    }

    pub fn squash(mut self, squash: bool) -> Self {
        self.spec.squash = squash;
        self
    }

    /// Squash even when the commits have several authors.
    pub fn force_squash(mut self, force: bool) -> Self {
        self.spec.force_squash = force;
        self
    }

    pub fn message(mut self, message: impl Into<MergeMessage>) -> Self {
        self.spec.message = message.into();
        self
    }

    pub fn append_log(mut self, append: bool) -> Self {
        self.spec.append_log = append;
        self
    }

    pub fn fast_forward(mut self, ff: bool) -> Self {
        self.spec.fast_forward = ff;
        self
    }

    pub fn realign(mut self, realignment: Realignment) -> Self {
        self.spec.realignment = realignment;
        self
    }

    pub fn keep_temp_branches(mut self, keep: bool) -> Self {
        self.spec.keep_temp_branches = keep;
        self
    }

    /// Run the merge on staging branches.
    ///
    /// On any error the original branch is restored and, unless staging
    /// branches are kept, every staging branch is deleted.
    pub fn perform(self) -> Result<MergeCompleted<'g, G>, EngineError> {
        let git = self.git;
        let spec = self.spec;
        if spec.fast_forward && (spec.squash || spec.append_log) {
            return Err(EngineError::user(
                "--fast-forward cannot be combined with squashing or a commit log",
            ));
        }

        git.guard_working_tree_ready()?;

        let cleanup = !spec.keep_temp_branches;
        let mut guard = BranchGuard::acquire(git, cleanup)?;

        git.remote_update(spec.source.remote())?;
        if spec.target.remote() != spec.source.remote() {
            git.remote_update(spec.target.remote())?;
        }

        let target = match &spec.switch_base {
            Some(base) => spec.target.with_branch(base.clone()),
            None => spec.target.clone(),
        };
        let target_staging = stage(git, &mut guard, &target)?;
        let source_staging = stage(git, &mut guard, &spec.source)?;

        if spec.switch_base.is_some() {
            RebaseExecutor::new(git, spec.target.tracking())
                .onto(target_staging.as_str())
                .branch(source_staging.as_str())
                .perform()
                .map_err(|e| EngineError::MergeWorkflow {
                    message: format!(
                        "could not move '{}' from '{}' onto '{}'",
                        spec.source.branch(),
                        spec.target.branch(),
                        target.branch()
                    ),
                    source: Some(e),
                })?;
        }

        realign(git, &spec, &target, &target_staging, &source_staging)?;

        if spec.squash {
            git.squash_commits(
                target_staging.as_str(),
                source_staging.as_str(),
                spec.force_squash,
            )
            .map_err(|e| match e {
                GitError::MultipleAuthors { authors } => EngineError::CannotSquashMultipleAuthors {
                    branch: spec.source.branch().to_string(),
                    authors,
                },
                other => other.into(),
            })?;
        }

        let message = spec
            .message
            .resolve(target.branch().as_str(), spec.source.branch().as_str());

        let merged = if spec.fast_forward {
            git.merge_branch(target_staging.as_str(), source_staging.as_str(), &message, true)
        } else if spec.append_log {
            git.merge_branch_with_log(
                target_staging.as_str(),
                source_staging.as_str(),
                &message,
                &spec.source.tracking(),
            )
        } else {
            git.merge_branch(target_staging.as_str(), source_staging.as_str(), &message, false)
        };
        let commit = match merged {
            Ok(commit) => commit,
            Err(e) => {
                if !spec.fast_forward {
                    if let Err(abort) = git.run_command(&["merge", "--abort"]) {
                        tracing::debug!(error = %abort, "merge --abort failed");
                    }
                }
                return Err(e.into());
            }
        };
        tracing::info!(
            source = %spec.source,
            target = %target,
            commit = commit.short(8),
            "merged on staging branch"
        );

        let original = guard.original().branch().cloned();
        guard.untrack(&target_staging);
        guard.release()?;

        Ok(MergeCompleted {
            git,
            commit,
            target,
            staging: target_staging,
            original,
            cleanup,
        })
    }
}

/// Check out `remote_ref` and branch a tracked staging branch from it.
fn stage<G: GitPort + ?Sized>(
    git: &G,
    guard: &mut BranchGuard<'_, G>,
    remote_ref: &RemoteRef,
) -> Result<BranchName, EngineError> {
    git.checkout(&remote_ref.tracking(), false)?;
    let staging = git.create_temp_branch(remote_ref.branch().as_str())?;
    git.checkout(staging.as_str(), true)?;
    guard.track(&staging);
    tracing::debug!(from = %remote_ref, %staging, "staged");
    Ok(staging)
}

fn realign<G: GitPort + ?Sized>(
    git: &G,
    spec: &MergeSpec,
    target: &RemoteRef,
    target_staging: &BranchName,
    source_staging: &BranchName,
) -> Result<(), EngineError> {
    let tip = git.rev_parse(target_staging.as_str())?;
    let fork = git.merge_base(target_staging.as_str(), source_staging.as_str())?;
    if tip == fork {
        return Ok(());
    }
    tracing::debug!(%tip, %fork, target = %target, "target moved since source forked");

    match spec.realignment {
        Realignment::None => Ok(()),
        Realignment::Guard => Err(EngineError::MergeWorkflow {
            message: format!(
                "'{}' has moved since '{}' forked from it; refusing to merge against stale history",
                target.branch(),
                spec.source.branch()
            ),
            source: None,
        }),
        Realignment::Rebase => RebaseExecutor::new(git, target_staging.as_str())
            .branch(source_staging.as_str())
            .perform()
            .map_err(|e| EngineError::MergeWorkflow {
                message: format!(
                    "could not rebase '{}' onto '{}'",
                    spec.source.branch(),
                    target.branch()
                ),
                source: Some(e),
            }),
    }
}

/// A merge committed on the target staging branch, ready to push.
///
/// Dropping it without pushing deletes the staging branch (unless staging
/// branches are kept).
#[derive(Debug)]
pub struct MergeCompleted<'g, G: GitPort + ?Sized> {
    git: &'g G,
    commit: Oid,
    target: RemoteRef,
    staging: BranchName,
    original: Option<BranchName>,
    cleanup: bool,
}

impl<G: GitPort + ?Sized> MergeCompleted<'_, G> {
    /// The merge commit (or fast-forwarded tip).
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    /// The effective target (the switch base, if one was set).
    pub fn target(&self) -> &RemoteRef {
        &self.target
    }

    pub fn staging_branch(&self) -> &BranchName {
        &self.staging
    }

    /// Push `<staging>:<target>` to the target remote.
    ///
    /// A failed push keeps the staging branch so the merge is not lost.
    pub fn push(mut self) -> Result<(), EngineError> {
        let refspec = RefSpec::new(self.staging.as_str(), self.target.branch().as_str())?;
        if let Err(e) = self.git.push_to_remote(self.target.remote(), &refspec, false) {
            self.cleanup = false;
            tracing::warn!(staging = %self.staging, "push failed, staging branch kept");
            return Err(e.into());
        }
        tracing::info!(target = %self.target, commit = self.commit.short(8), "merge pushed");
        Ok(())
    }
}

impl<G: GitPort + ?Sized> Drop for MergeCompleted<'_, G> {
    fn drop(&mut self) {
        if self.cleanup {
            if let Err(e) = delete_staging_branch(self.git, &self.staging, self.original.as_ref()) {
                tracing::warn!(staging = %self.staging, error = %e, "could not delete staging branch");
            }
        }
    }
}
