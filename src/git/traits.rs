//! git::traits
//!
//! The `GitPort` trait: every repository interaction the engine performs.
//!
//! # Design
//!
//! The working tree is an explicit resource handed to each operation as a
//! `&G where G: GitPort`, never reached through the process's current
//! directory. Production code uses [`crate::git::Git`]; tests substitute
//! [`crate::git::mock::MockGit`].
//!
//! Methods are synchronous and block on child processes. Mutating methods
//! surface a failing command as [`GitError::Process`] carrying its stderr.

use std::path::Path;

use super::GitError;
use crate::core::types::{BranchName, Oid, RefSpec, SyncStatus};

/// Port to a Git working tree.
pub trait GitPort {
    /// Run `git <args>` in the working tree and return its stdout.
    fn run_command(&self, args: &[&str]) -> Result<String, GitError>;

    /// The checked-out branch, or `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;

    /// Check out `refname`, or create and check out a new branch named
    /// `refname` at HEAD when `create_new` is set.
    fn checkout(&self, refname: &str, create_new: bool) -> Result<(), GitError>;

    /// Refresh the remote-tracking refs of `remote`.
    fn remote_update(&self, remote: &str) -> Result<(), GitError>;

    /// Push `refspec` to `remote`.
    ///
    /// Taking a [`RefSpec`] means the local side is never empty, so a push
    /// can never delete a remote branch.
    fn push_to_remote(&self, remote: &str, refspec: &RefSpec, force: bool)
        -> Result<(), GitError>;

    /// Pick a unique, currently unused name for a staging branch seeded
    /// from `seed`. The branch itself is not created.
    fn create_temp_branch(&self, seed: &str) -> Result<BranchName, GitError>;

    /// Merge `branch` into `base` (checking out `base`) and return the new
    /// head of `base`. With `fast_forward` only a fast-forward is accepted;
    /// otherwise a merge commit is always created.
    fn merge_branch(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        fast_forward: bool,
    ) -> Result<Oid, GitError>;

    /// Like [`GitPort::merge_branch`] without fast-forward, appending a
    /// one-line-per-commit summary of `base..branch` to `message`.
    fn merge_branch_with_log(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        source_label: &str,
    ) -> Result<Oid, GitError>;

    /// Collapse the commits of `branch` since it forked from `base` into one,
    /// reusing the first commit's author and message.
    ///
    /// Fails with [`GitError::MultipleAuthors`] when the commits have more
    /// than one author, unless `allow_multiple_authors` is set.
    fn squash_commits(
        &self,
        base: &str,
        branch: &str,
        allow_multiple_authors: bool,
    ) -> Result<(), GitError>;

    /// Fail unless the working tree is clean and no rebase/merge is in progress.
    fn guard_working_tree_ready(&self) -> Result<(), GitError>;

    /// Fail unless local branch `branch` exists.
    fn guard_branch_exists(&self, branch: &str) -> Result<(), GitError>;

    /// Fail unless `branch` exists on `remote`.
    fn guard_remote_branch_exists(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Relationship between `local` and `remote/remote_branch`.
    fn remote_diff_status(
        &self,
        remote: &str,
        local: &str,
        remote_branch: &str,
    ) -> Result<SyncStatus, GitError>;

    /// Resolve a revision to a commit id.
    fn rev_parse(&self, rev: &str) -> Result<Oid, GitError>;

    /// The fork point of two revisions.
    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError>;

    /// Reset the checked-out branch, index and working tree to `rev`.
    fn reset_hard(&self, rev: &str) -> Result<(), GitError>;

    /// Delete local branch `branch`, merged or not.
    fn delete_branch(&self, branch: &str) -> Result<(), GitError>;

    /// Apply a unified diff with the external `patch` utility.
    fn apply_patch(&self, patch_file: &Path, strip_level: u32) -> Result<(), GitError>;

    /// Stage every change and commit it with `message`.
    fn commit_all(&self, message: &str) -> Result<Oid, GitError>;

    /// Add a remote. An existing remote with the same name is accepted.
    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError>;
}
