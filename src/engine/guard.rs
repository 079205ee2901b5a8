//! engine::guard
//!
//! Scoped branch restoration.
//!
//! A [`BranchGuard`] is acquired before an operation moves HEAD. It
//! remembers what was checked out (a branch, or a commit when HEAD is
//! detached) and puts it back on every exit path:
//!
//! - on success, [`BranchGuard::release`] restores and reports errors
//! - on early return or panic, `Drop` restores and logs a warning
//!
//! The guard also owns the staging branches registered with
//! [`BranchGuard::track`]. With cleanup enabled they are deleted after the
//! original branch is back; a branch handed off with
//! [`BranchGuard::untrack`] survives a successful release.

use crate::core::naming::is_temp_branch;
use crate::core::types::{BranchName, Oid};
use crate::git::GitPort;

use super::EngineError;

/// What HEAD pointed at when the guard was acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginalHead {
    Branch(BranchName),
    Detached(Oid),
}

impl OriginalHead {
    fn refname(&self) -> &str {
        match self {
            OriginalHead::Branch(b) => b.as_str(),
            OriginalHead::Detached(oid) => oid.as_str(),
        }
    }

    /// The branch, when HEAD was not detached.
    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            OriginalHead::Branch(b) => Some(b),
            OriginalHead::Detached(_) => None,
        }
    }
}

/// Restores the original HEAD when dropped.
pub struct BranchGuard<'g, G: GitPort + ?Sized> {
    git: &'g G,
    original: OriginalHead,
    staging: Vec<BranchName>,
    cleanup: bool,
    armed: bool,
}

impl<'g, G: GitPort + ?Sized> BranchGuard<'g, G> {
    /// Remember the current HEAD.
    ///
    /// With `cleanup`, tracked staging branches are deleted when the guard
    /// ends.
    pub fn acquire(git: &'g G, cleanup: bool) -> Result<Self, EngineError> {
        let original = match git.current_branch()? {
            Some(branch) => OriginalHead::Branch(branch),
            None => OriginalHead::Detached(git.rev_parse("HEAD")?),
        };
        tracing::debug!(original = original.refname(), "branch guard acquired");

        Ok(Self {
            git,
            original,
            staging: Vec::new(),
            cleanup,
            armed: true,
        })
    }

    pub fn original(&self) -> &OriginalHead {
        &self.original
    }

    /// Register a staging branch owned by this operation.
    pub fn track(&mut self, branch: &BranchName) {
        self.staging.push(branch.clone());
    }

    /// Hand a staging branch over to the caller; it is no longer cleaned up
    /// by a successful release.
    pub fn untrack(&mut self, branch: &BranchName) {
        self.staging.retain(|b| b != branch);
    }

    /// Restore the original HEAD and clean up tracked branches.
    pub fn release(mut self) -> Result<(), EngineError> {
        self.armed = false;
        self.git.checkout(self.original.refname(), false)?;
        tracing::debug!(original = self.original.refname(), "original head restored");

        if self.cleanup {
            for branch in std::mem::take(&mut self.staging) {
                delete_staging_branch(self.git, &branch, self.original.branch())?;
            }
        }
        Ok(())
    }

    fn unwind(&mut self) {
        if let Err(e) = self.git.checkout(self.original.refname(), false) {
            tracing::warn!(
                original = self.original.refname(),
                error = %e,
                "could not restore original branch"
            );
        }
        if self.cleanup {
            for branch in &self.staging {
                if let Err(e) = delete_staging_branch(self.git, branch, self.original.branch()) {
                    tracing::warn!(%branch, error = %e, "could not delete staging branch");
                }
            }
        }
    }
}

impl<G: GitPort + ?Sized> Drop for BranchGuard<'_, G> {
    fn drop(&mut self) {
        if self.armed {
            self.unwind();
        }
    }
}

/// Delete a local staging branch, refusing to touch `protected`.
pub(crate) fn delete_staging_branch<G: GitPort + ?Sized>(
    git: &G,
    branch: &BranchName,
    protected: Option<&BranchName>,
) -> Result<(), EngineError> {
    if protected == Some(branch) {
        return Err(EngineError::user(format!(
            "refusing to delete '{}': it was checked out when the operation started",
            branch
        )));
    }
    if !is_temp_branch(branch.as_str()) {
        return Err(EngineError::Invariant(format!(
            "'{}' is not a staging branch",
            branch
        )));
    }
    git.delete_branch(branch.as_str())?;
    tracing::debug!(%branch, "staging branch deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{FailOn, MockGit, MockOperation};

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    #[test]
    fn drop_restores_original_branch() {
        let git = MockGit::new().with_current_branch("dev");
        {
            let _guard = BranchGuard::acquire(&git, false).unwrap();
            git.checkout("upstream/dev", false).unwrap();
            assert_eq!(git.head(), None);
        }
        assert_eq!(git.head().as_deref(), Some("dev"));
    }

    #[test]
    fn drop_deletes_tracked_branches_with_cleanup() {
        let git = MockGit::new();
        {
            let mut guard = BranchGuard::acquire(&git, true).unwrap();
            git.checkout("ferry-tmp/a-1", true).unwrap();
            guard.track(&branch("ferry-tmp/a-1"));
        }
        assert_eq!(git.head().as_deref(), Some("main"));
        assert!(!git.has_branch("ferry-tmp/a-1"));
    }

    #[test]
    fn drop_keeps_tracked_branches_without_cleanup() {
        let git = MockGit::new();
        {
            let mut guard = BranchGuard::acquire(&git, false).unwrap();
            git.checkout("ferry-tmp/a-1", true).unwrap();
            guard.track(&branch("ferry-tmp/a-1"));
        }
        assert!(git.has_branch("ferry-tmp/a-1"));
    }

    #[test]
    fn release_spares_untracked_branch() {
        let git = MockGit::new();
        let mut guard = BranchGuard::acquire(&git, true).unwrap();
        git.checkout("ferry-tmp/a-1", true).unwrap();
        git.checkout("ferry-tmp/b-2", true).unwrap();
        guard.track(&branch("ferry-tmp/a-1"));
        guard.track(&branch("ferry-tmp/b-2"));
        guard.untrack(&branch("ferry-tmp/b-2"));
        guard.release().unwrap();

        assert!(!git.has_branch("ferry-tmp/a-1"));
        assert!(git.has_branch("ferry-tmp/b-2"));
    }

    #[test]
    fn release_reports_restore_failure() {
        let git = MockGit::new().fail_on(FailOn::Checkout("main".into()));
        let guard = BranchGuard::acquire(&git, false).unwrap();
        assert!(matches!(guard.release(), Err(EngineError::Git(_))));
    }

    #[test]
    fn release_does_not_restore_twice() {
        let git = MockGit::new();
        let guard = BranchGuard::acquire(&git, false).unwrap();
        guard.release().unwrap();
        let checkouts = git
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::Checkout { .. }))
            .count();
        assert_eq!(checkouts, 1);
    }

    #[test]
    fn detached_head_restored_by_commit() {
        let git = MockGit::new().detached();
        let guard = BranchGuard::acquire(&git, false).unwrap();
        assert!(matches!(guard.original(), OriginalHead::Detached(_)));
        guard.release().unwrap();
        assert!(matches!(
            git.operations().last(),
            Some(MockOperation::Checkout { refname, .. }) if refname.starts_with("1111")
        ));
    }

    #[test]
    fn refuses_to_delete_non_staging_branch() {
        let git = MockGit::new().with_branch("dev");
        let err = delete_staging_branch(&git, &branch("dev"), Some(&branch("main"))).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(_)));
        assert!(git.has_branch("dev"));
    }

    #[test]
    fn refuses_to_delete_original_branch() {
        let git = MockGit::new();
        let err = delete_staging_branch(&git, &branch("main"), Some(&branch("main"))).unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
        assert!(git.operations().is_empty());
    }
}
