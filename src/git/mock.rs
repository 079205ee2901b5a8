//! git::mock
//!
//! Recording implementation of [`GitPort`] for deterministic testing.
//!
//! # Design
//!
//! `MockGit` never touches a repository. It tracks which branch is checked
//! out and which local branches exist, records every mutating call as a
//! [`MockOperation`], and answers queries from values configured up front.
//! Failures are injected with [`FailOn`].
//!
//! Object ids are fixed so assertions stay readable:
//! - `rev_parse` always returns `1111…`
//! - `merge_base` returns `1111…`, or `2222…` when drift is configured
//! - merges return `3333…`, commits `4444…`
//!
//! # Example
//!
//! ```
//! use gitferry::git::mock::{MockGit, MockOperation};
//! use gitferry::git::GitPort;
//!
//! let git = MockGit::new().with_current_branch("dev");
//! git.checkout("upstream/dev", false).unwrap();
//!
//! assert_eq!(git.head(), None);
//! assert!(matches!(
//!     git.operations().last(),
//!     Some(MockOperation::Checkout { refname, create_new: false }) if refname == "upstream/dev"
//! ));
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::GitPort;
use super::GitError;
use crate::core::naming::{slugify, TEMP_BRANCH_PREFIX};
use crate::core::types::{BranchName, Oid, RefSpec, SyncStatus};

/// Id returned by `rev_parse`.
pub const HEAD_OID: &str = "1111111111111111111111111111111111111111";
/// Id returned by `merge_base` when the target has drifted.
pub const DRIFTED_BASE_OID: &str = "2222222222222222222222222222222222222222";
/// Id returned by merges.
pub const MERGE_OID: &str = "3333333333333333333333333333333333333333";
/// Id returned by `commit_all`.
pub const COMMIT_OID: &str = "4444444444444444444444444444444444444444";

/// Mock working tree.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockGit {
    inner: Arc<Mutex<MockGitInner>>,
}

#[derive(Debug)]
struct MockGitInner {
    head: Option<String>,
    branches: BTreeSet<String>,
    missing_remote_branches: BTreeSet<(String, String)>,
    status: SyncStatus,
    drifted: bool,
    authors: Vec<String>,
    dirty: bool,
    next_temp: u32,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

/// Which call should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    /// `run_command` whose argv starts with these words.
    Command(Vec<String>),
    /// Any `rebase` other than `rebase --abort`.
    Rebase,
    /// `rebase --abort`.
    RebaseAbort,
    /// Checkout of this ref.
    Checkout(String),
    /// Update of this remote.
    RemoteUpdate(String),
    Push,
    Merge,
    Squash,
    ApplyPatch,
    Commit,
    ResetHard,
    DeleteBranch,
    AddRemote,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Command {
        args: Vec<String>,
    },
    Checkout {
        refname: String,
        create_new: bool,
    },
    RemoteUpdate {
        remote: String,
    },
    Push {
        remote: String,
        refspec: String,
        force: bool,
    },
    Merge {
        base: String,
        branch: String,
        message: String,
        fast_forward: bool,
    },
    MergeWithLog {
        base: String,
        branch: String,
        message: String,
        source_label: String,
    },
    Squash {
        base: String,
        branch: String,
    },
    ResetHard {
        rev: String,
    },
    DeleteBranch {
        branch: String,
    },
    ApplyPatch {
        patch_file: PathBuf,
        strip_level: u32,
    },
    Commit {
        message: String,
    },
    AddRemote {
        name: String,
        url: String,
    },
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGit {
    /// A clean tree on `main`, up to date with every remote.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockGitInner {
                head: Some("main".to_string()),
                branches: BTreeSet::from(["main".to_string()]),
                missing_remote_branches: BTreeSet::new(),
                status: SyncStatus::UpToDate,
                drifted: false,
                authors: vec!["Dev <dev@example.com>".to_string()],
                dirty: false,
                next_temp: 1,
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Check out `branch`, creating it if needed.
    pub fn with_current_branch(self, branch: &str) -> Self {
        {
            let mut inner = self.lock();
            inner.branches.insert(branch.to_string());
            inner.head = Some(branch.to_string());
        }
        self
    }

    /// Start with a detached HEAD.
    pub fn detached(self) -> Self {
        self.lock().head = None;
        self
    }

    /// Add a local branch.
    pub fn with_branch(self, branch: &str) -> Self {
        self.lock().branches.insert(branch.to_string());
        self
    }

    /// Make `guard_remote_branch_exists(remote, branch)` fail.
    pub fn without_remote_branch(self, remote: &str, branch: &str) -> Self {
        self.lock()
            .missing_remote_branches
            .insert((remote.to_string(), branch.to_string()));
        self
    }

    /// Answer for every `remote_diff_status`.
    pub fn with_status(self, status: SyncStatus) -> Self {
        self.lock().status = status;
        self
    }

    /// Make the fork point differ from the target tip.
    pub fn with_drift(self) -> Self {
        self.lock().drifted = true;
        self
    }

    /// Authors of the commits `squash_commits` sees.
    pub fn with_authors(self, authors: &[&str]) -> Self {
        self.lock().authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Report uncommitted changes.
    pub fn dirty(self) -> Self {
        self.lock().dirty = true;
        self
    }

    /// Inject a failure.
    pub fn fail_on(self, fail: FailOn) -> Self {
        self.lock().fail_on.push(fail);
        self
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Recorded pushes as `(remote, refspec, force)`.
    pub fn pushes(&self) -> Vec<(String, String, bool)> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::Push {
                    remote,
                    refspec,
                    force,
                } => Some((remote, refspec, force)),
                _ => None,
            })
            .collect()
    }

    /// The checked-out branch, `None` when detached.
    pub fn head(&self) -> Option<String> {
        self.lock().head.clone()
    }

    /// Whether local branch `branch` exists.
    pub fn has_branch(&self, branch: &str) -> bool {
        self.lock().branches.contains(branch)
    }

    /// Local branches that look like staging branches.
    pub fn temp_branches(&self) -> Vec<String> {
        self.lock()
            .branches
            .iter()
            .filter(|b| b.starts_with(TEMP_BRANCH_PREFIX))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockGitInner> {
        // A test that panicked mid-call poisons the lock; keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    fn check(&self, fail: &FailOn, command: &str) -> Result<(), GitError> {
        if self.lock().fail_on.contains(fail) {
            return Err(injected(command));
        }
        Ok(())
    }

    fn set_head(&self, refname: &str) {
        let mut inner = self.lock();
        inner.head = inner.branches.contains(refname).then(|| refname.to_string());
    }
}

fn injected(command: &str) -> GitError {
    GitError::Process {
        command: command.to_string(),
        stderr: "injected failure".to_string(),
        exit_code: Some(1),
    }
}

fn oid(hex: &str) -> Oid {
    Oid::new(hex).unwrap_or_else(|_| Oid::zero())
}

impl GitPort for MockGit {
    fn run_command(&self, args: &[&str]) -> Result<String, GitError> {
        let argv: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.record(MockOperation::Command { args: argv.clone() });
        let command = format!("git {}", argv.join(" "));

        let is_rebase = args.first() == Some(&"rebase");
        let is_abort = is_rebase && args.get(1) == Some(&"--abort");
        let inner = self.lock();
        let failed = inner.fail_on.iter().any(|f| match f {
            FailOn::Command(prefix) => argv.starts_with(prefix),
            FailOn::Rebase => is_rebase && !is_abort,
            FailOn::RebaseAbort => is_abort,
            _ => false,
        });
        if failed {
            return Err(injected(&command));
        }
        Ok(String::new())
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        match self.head() {
            Some(name) => Ok(Some(BranchName::new(name)?)),
            None => Ok(None),
        }
    }

    fn checkout(&self, refname: &str, create_new: bool) -> Result<(), GitError> {
        self.record(MockOperation::Checkout {
            refname: refname.to_string(),
            create_new,
        });
        self.check(
            &FailOn::Checkout(refname.to_string()),
            &format!("git checkout {}", refname),
        )?;
        if create_new {
            self.lock().branches.insert(refname.to_string());
        }
        self.set_head(refname);
        Ok(())
    }

    fn remote_update(&self, remote: &str) -> Result<(), GitError> {
        self.record(MockOperation::RemoteUpdate {
            remote: remote.to_string(),
        });
        self.check(
            &FailOn::RemoteUpdate(remote.to_string()),
            &format!("git remote update {}", remote),
        )
    }

    fn push_to_remote(&self, remote: &str, refspec: &RefSpec, force: bool) -> Result<(), GitError> {
        self.record(MockOperation::Push {
            remote: remote.to_string(),
            refspec: refspec.to_string(),
            force,
        });
        self.check(&FailOn::Push, &format!("git push {} {}", remote, refspec))
    }

    fn create_temp_branch(&self, seed: &str) -> Result<BranchName, GitError> {
        let mut inner = self.lock();
        let n = inner.next_temp;
        inner.next_temp += 1;
        Ok(BranchName::new(format!(
            "{}{}-{}",
            TEMP_BRANCH_PREFIX,
            slugify(seed),
            n
        ))?)
    }

    fn merge_branch(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        fast_forward: bool,
    ) -> Result<Oid, GitError> {
        self.record(MockOperation::Merge {
            base: base.to_string(),
            branch: branch.to_string(),
            message: message.to_string(),
            fast_forward,
        });
        self.set_head(base);
        self.check(&FailOn::Merge, &format!("git merge {}", branch))?;
        Ok(oid(MERGE_OID))
    }

    fn merge_branch_with_log(
        &self,
        base: &str,
        branch: &str,
        message: &str,
        source_label: &str,
    ) -> Result<Oid, GitError> {
        self.record(MockOperation::MergeWithLog {
            base: base.to_string(),
            branch: branch.to_string(),
            message: message.to_string(),
            source_label: source_label.to_string(),
        });
        self.set_head(base);
        self.check(&FailOn::Merge, &format!("git merge {}", branch))?;
        Ok(oid(MERGE_OID))
    }

    fn squash_commits(
        &self,
        base: &str,
        branch: &str,
        allow_multiple_authors: bool,
    ) -> Result<(), GitError> {
        self.record(MockOperation::Squash {
            base: base.to_string(),
            branch: branch.to_string(),
        });
        let authors: BTreeSet<String> = self.lock().authors.iter().cloned().collect();
        if authors.len() > 1 && !allow_multiple_authors {
            return Err(GitError::MultipleAuthors {
                authors: authors.into_iter().collect(),
            });
        }
        self.set_head(branch);
        self.check(&FailOn::Squash, "git reset --soft")
    }

    fn guard_working_tree_ready(&self) -> Result<(), GitError> {
        if self.lock().dirty {
            return Err(GitError::DirtyWorktree {
                details: "1 unstaged".to_string(),
            });
        }
        Ok(())
    }

    fn guard_branch_exists(&self, branch: &str) -> Result<(), GitError> {
        if self.has_branch(branch) {
            Ok(())
        } else {
            Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            })
        }
    }

    fn guard_remote_branch_exists(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let key = (remote.to_string(), branch.to_string());
        if self.lock().missing_remote_branches.contains(&key) {
            return Err(GitError::RemoteBranchNotFound {
                remote: key.0,
                branch: key.1,
            });
        }
        Ok(())
    }

    fn remote_diff_status(
        &self,
        _remote: &str,
        _local: &str,
        _remote_branch: &str,
    ) -> Result<SyncStatus, GitError> {
        Ok(self.lock().status)
    }

    fn rev_parse(&self, _rev: &str) -> Result<Oid, GitError> {
        Ok(oid(HEAD_OID))
    }

    fn merge_base(&self, _a: &str, _b: &str) -> Result<Oid, GitError> {
        if self.lock().drifted {
            Ok(oid(DRIFTED_BASE_OID))
        } else {
            Ok(oid(HEAD_OID))
        }
    }

    fn reset_hard(&self, rev: &str) -> Result<(), GitError> {
        self.record(MockOperation::ResetHard {
            rev: rev.to_string(),
        });
        self.check(&FailOn::ResetHard, &format!("git reset --hard {}", rev))
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::DeleteBranch {
            branch: branch.to_string(),
        });
        let command = format!("git branch -D {}", branch);
        self.check(&FailOn::DeleteBranch, &command)?;
        let mut inner = self.lock();
        if inner.head.as_deref() == Some(branch) {
            return Err(GitError::Process {
                command,
                stderr: format!("cannot delete branch '{}' checked out", branch),
                exit_code: Some(1),
            });
        }
        if !inner.branches.remove(branch) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        Ok(())
    }

    fn apply_patch(&self, patch_file: &Path, strip_level: u32) -> Result<(), GitError> {
        self.record(MockOperation::ApplyPatch {
            patch_file: patch_file.to_path_buf(),
            strip_level,
        });
        self.check(
            &FailOn::ApplyPatch,
            &format!("patch -p{} --input {}", strip_level, patch_file.display()),
        )
    }

    fn commit_all(&self, message: &str) -> Result<Oid, GitError> {
        self.record(MockOperation::Commit {
            message: message.to_string(),
        });
        self.check(&FailOn::Commit, "git commit")?;
        Ok(oid(COMMIT_OID))
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.record(MockOperation::AddRemote {
            name: name.to_string(),
            url: url.to_string(),
        });
        self.check(&FailOn::AddRemote, &format!("git remote add {} {}", name, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_tracks_head() {
        let git = MockGit::new().with_branch("dev");
        git.checkout("dev", false).unwrap();
        assert_eq!(git.head().as_deref(), Some("dev"));

        git.checkout("upstream/dev", false).unwrap();
        assert_eq!(git.head(), None);

        git.checkout("topic", true).unwrap();
        assert_eq!(git.head().as_deref(), Some("topic"));
        assert!(git.has_branch("topic"));
    }

    #[test]
    fn temp_names_are_sequential() {
        let git = MockGit::new();
        assert_eq!(
            git.create_temp_branch("release/1.0").unwrap().as_str(),
            "ferry-tmp/release-1-0-1"
        );
        assert_eq!(
            git.create_temp_branch("release/1.0").unwrap().as_str(),
            "ferry-tmp/release-1-0-2"
        );
    }

    #[test]
    fn rebase_failure_spares_abort() {
        let git = MockGit::new().fail_on(FailOn::Rebase);
        assert!(git.run_command(&["rebase", "main"]).is_err());
        assert!(git.run_command(&["rebase", "--abort"]).is_ok());
    }

    #[test]
    fn command_prefix_failure() {
        let git = MockGit::new().fail_on(FailOn::Command(vec!["status".into()]));
        assert!(git.run_command(&["status", "--short"]).is_err());
        assert!(git.run_command(&["log"]).is_ok());
    }

    #[test]
    fn cannot_delete_checked_out_branch() {
        let git = MockGit::new();
        assert!(git.delete_branch("main").is_err());
        assert!(git.has_branch("main"));
    }

    #[test]
    fn squash_refuses_multiple_authors() {
        let git = MockGit::new().with_authors(&["A <a@x>", "B <b@x>"]);
        let err = git.squash_commits("main", "topic", false).unwrap_err();
        assert!(matches!(err, GitError::MultipleAuthors { ref authors } if authors.len() == 2));
        assert!(git.squash_commits("main", "topic", true).is_ok());
    }

    #[test]
    fn drift_changes_merge_base() {
        let git = MockGit::new();
        assert_eq!(git.merge_base("a", "b").unwrap(), git.rev_parse("a").unwrap());
        let git = git.with_drift();
        assert_ne!(git.merge_base("a", "b").unwrap(), git.rev_parse("a").unwrap());
    }

    #[test]
    fn records_pushes() {
        let git = MockGit::new();
        let spec = RefSpec::new("dev", "dev").unwrap();
        git.push_to_remote("origin", &spec, true).unwrap();
        assert_eq!(git.pushes(), vec![("origin".into(), "dev:dev".into(), true)]);
    }
}
