//! git::interface
//!
//! Production implementation of [`GitPort`].
//!
//! # Architecture
//!
//! Read-only queries (current branch, status, ancestry, ahead/behind) go
//! through `git2`. Every mutation (checkout, rebase, merge, push, commit)
//! shells out to the `git` executable via [`ProcessRunner`], so hooks,
//! credentials and config behave exactly as they do for the user.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::DirtyWorktree`]: Working tree has uncommitted changes
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//! - [`GitError::Process`]: A git (or patch) invocation exited non-zero
//! - [`GitError::Timeout`]: An invocation ran past the configured limit
//!
//! # Example
//!
//! ```ignore
//! use gitferry::git::{Git, GitPort};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let status = git.remote_diff_status("upstream", "dev", "dev")?;
//! println!("dev is {}", status);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::runner::ProcessRunner;
use super::traits::GitPort;
use crate::core::naming;
use crate::core::types::{BranchName, Oid, RefSpec, SyncStatus, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {}", .path.display())]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref or revision does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// Local branch does not exist.
    #[error("branch '{branch}' does not exist")]
    BranchNotFound { branch: String },

    /// Branch does not exist on the remote.
    #[error("branch '{branch}' does not exist on remote '{remote}'")]
    RemoteBranchNotFound { remote: String, branch: String },

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress { operation: GitState },

    /// Working tree has uncommitted changes.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree { details: String },

    /// A command exited non-zero.
    #[error("`{command}` failed{}: {stderr}", .exit_code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    Process {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// A command ran past its wall-clock limit and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// A command could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Squash refused because the commits have several authors.
    #[error("cannot squash commits from multiple authors: {}", .authors.join(", "))]
    MultipleAuthors { authors: Vec<String> },

    /// A value read from git failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => GitError::RefNotFound {
                refname: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Rebase,
    Merge,
    CherryPick,
    Revert,
    Bisect,
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use gitferry::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Rebase.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        };
        f.write_str(s)
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Untracked files do not count.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.staged > 0 {
            parts.push(format!("{} staged", self.staged));
        }
        if self.unstaged > 0 {
            parts.push(format!("{} unstaged", self.unstaged));
        }
        if self.has_conflicts {
            parts.push("unresolved conflicts".to_string());
        }
        parts.join(", ")
    }
}

/// The Git working tree.
///
/// `git2` answers questions; the `git` executable makes changes.
pub struct Git {
    repo: git2::Repository,
    runner: ProcessRunner,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.runner.work_dir())
            .field("timeout", &self.runner.timeout())
            .finish()
    }
}

impl Git {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(Self {
            repo,
            runner: ProcessRunner::new(work_dir),
        })
    }

    /// Bound every child process by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// Root of the working tree.
    pub fn work_dir(&self) -> &Path {
        self.runner.work_dir()
    }

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Get working tree status summary, ignoring untracked files.
    pub fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut result = WorktreeStatus::default();
        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
        }

        Ok(result)
    }

    fn resolve(&self, rev: &str) -> Result<git2::Oid, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|e| GitError::from_git2(e, rev))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, rev))?;
        Ok(commit.id())
    }

    fn ref_exists(&self, refname: &str) -> bool {
        self.repo.find_reference(refname).is_ok()
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        self.runner.run("git", args)
    }

    /// One `<short> <subject>` line per commit in `base..branch`, oldest first.
    fn commit_summary(&self, base: &str, branch: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{}..{}", base, branch);
        let out = self.git(&["log", "--reverse", "--no-decorate", "--format=%h %s", &range])?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

impl GitPort for Git {
    fn run_command(&self, args: &[&str]) -> Result<String, GitError> {
        self.git(args)
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        match head.shorthand() {
            Some(name) if head.is_branch() => Ok(Some(BranchName::new(name)?)),
            _ => Ok(None),
        }
    }

    fn checkout(&self, refname: &str, create_new: bool) -> Result<(), GitError> {
        if create_new {
            self.git(&["checkout", "--quiet", "-b", refname])?;
        } else {
            self.git(&["checkout", "--quiet", refname])?;
        }
        Ok(())
    }

    fn remote_update(&self, remote: &str) -> Result<(), GitError> {
        self.git(&["remote", "update", remote])?;
        Ok(())
    }

    fn push_to_remote(&self, remote: &str, refspec: &RefSpec, force: bool) -> Result<(), GitError> {
        let spec = refspec.to_string();
        let mut args = vec!["push", remote, spec.as_str()];
        if force {
            args.push("--force");
        }
        tracing::debug!(remote, local = refspec.local(), branch = refspec.remote(), force, "push");
        self.git(&args)?;
        Ok(())
    }

    fn create_temp_branch(&self, seed: &str) -> Result<BranchName, GitError> {
        loop {
            let name = naming::temp_branch_name(seed)?;
            if !self.ref_exists(&format!("refs/heads/{}", name)) {
                return Ok(name);
            }
        }
    }

    fn merge_branch(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        fast_forward: bool,
    ) -> Result<Oid, GitError> {
        self.checkout(base, false)?;
        if fast_forward {
            self.git(&["merge", "--ff-only", branch])?;
        } else {
            self.git(&["merge", "--no-ff", "-m", message, branch])?;
        }
        self.rev_parse("HEAD")
    }

    fn merge_branch_with_log(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        source_label: &str,
    ) -> Result<Oid, GitError> {
        let summary = self.commit_summary(base, branch)?;
        let message = with_commit_log(message, source_label, &summary);
        self.merge_branch(base, branch, &message, false)
    }

    fn squash_commits(
        &self,
        base: &str,
        branch: &str,
        allow_multiple_authors: bool,
    ) -> Result<(), GitError> {
        let fork = self.merge_base(base, branch)?;
        let range = format!("{}..{}", fork, branch);
        let log = self.git(&["log", "--reverse", "--format=%H%x09%an <%ae>", &range])?;

        let commits: Vec<(&str, &str)> = log
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .collect();
        let Some(&(first, _)) = commits.first() else {
            return Ok(());
        };
        if commits.len() == 1 {
            tracing::debug!(branch, "single commit, nothing to squash");
            return Ok(());
        }

        let authors: BTreeSet<&str> = commits.iter().map(|(_, author)| *author).collect();
        if authors.len() > 1 && !allow_multiple_authors {
            return Err(GitError::MultipleAuthors {
                authors: authors.into_iter().map(str::to_string).collect(),
            });
        }

        let first = first.to_string();
        self.checkout(branch, false)?;
        self.git(&["reset", "--soft", fork.as_str()])?;
        self.git(&["commit", "--quiet", "--reuse-message", &first])?;
        tracing::info!(branch, commits = commits.len(), "squashed");
        Ok(())
    }

    fn guard_working_tree_ready(&self) -> Result<(), GitError> {
        let state = self.state();
        if state.is_in_progress() {
            return Err(GitError::OperationInProgress { operation: state });
        }
        let status = self.worktree_status()?;
        if !status.is_clean() {
            return Err(GitError::DirtyWorktree {
                details: status.describe(),
            });
        }
        Ok(())
    }

    fn guard_branch_exists(&self, branch: &str) -> Result<(), GitError> {
        if self.ref_exists(&format!("refs/heads/{}", branch)) {
            Ok(())
        } else {
            Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            })
        }
    }

    fn guard_remote_branch_exists(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let head = format!("refs/heads/{}", branch);
        match self.git(&["ls-remote", "--exit-code", "--heads", remote, &head]) {
            Ok(_) => Ok(()),
            // ls-remote --exit-code exits 2 when no ref matched
            Err(GitError::Process {
                exit_code: Some(2), ..
            }) => Err(GitError::RemoteBranchNotFound {
                remote: remote.to_string(),
                branch: branch.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn remote_diff_status(
        &self,
        remote: &str,
        local: &str,
        remote_branch: &str,
    ) -> Result<SyncStatus, GitError> {
        let local_oid = self.resolve(&format!("refs/heads/{}", local))?;
        let remote_oid = self.resolve(&format!("refs/remotes/{}/{}", remote, remote_branch))?;
        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(local_oid, remote_oid)
            .map_err(|e| GitError::from_git2(e, local))?;
        let status = SyncStatus::from_counts(ahead, behind);
        tracing::debug!(local, remote, remote_branch, ahead, behind, %status, "remote diff status");
        Ok(status)
    }

    fn rev_parse(&self, rev: &str) -> Result<Oid, GitError> {
        Ok(Oid::new(self.resolve(rev)?.to_string())?)
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Oid, GitError> {
        let oid = self
            .repo
            .merge_base(self.resolve(a)?, self.resolve(b)?)
            .map_err(|e| GitError::from_git2(e, &format!("merge-base {} {}", a, b)))?;
        Ok(Oid::new(oid.to_string())?)
    }

    fn reset_hard(&self, rev: &str) -> Result<(), GitError> {
        self.git(&["reset", "--hard", "--quiet", rev])?;
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.git(&["branch", "-D", branch])?;
        Ok(())
    }

    fn apply_patch(&self, patch_file: &Path, strip_level: u32) -> Result<(), GitError> {
        let strip = format!("-p{}", strip_level);
        let file = patch_file.to_string_lossy();
        self.runner
            .run("patch", &[strip.as_str(), "--batch", "--input", file.as_ref()])?;
        Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<Oid, GitError> {
        self.git(&["add", "--all"])?;
        self.git(&["commit", "--quiet", "-m", message])?;
        self.rev_parse("HEAD")
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.git(&["remote", "add", name, url]) {
            Ok(_) => Ok(()),
            Err(e) if self.git(&["remote", "get-url", name]).is_ok() => {
                tracing::debug!(name, error = %e, "remote already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Append a commit summary to a merge message.
///
/// ```
/// use gitferry::git::with_commit_log;
///
/// let msg = with_commit_log("Merge 1.0 into 2.0", "upstream/1.0", &["abc1234 Fix crash".into()]);
/// assert_eq!(msg, "Merge 1.0 into 2.0\n\nCommits from upstream/1.0:\n* abc1234 Fix crash");
/// ```
pub fn with_commit_log(message: &str, source_label: &str, commits: &[String]) -> String {
    if commits.is_empty() {
        return message.to_string();
    }
    let lines: Vec<String> = commits.iter().map(|c| format!("* {}", c)).collect();
    format!(
        "{}\n\nCommits from {}:\n{}",
        message.trim_end(),
        source_label,
        lines.join("\n")
    )
}
