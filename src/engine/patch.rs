//! engine::patch
//!
//! Apply a unified diff to a freshly fetched remote branch and stage it for
//! push.
//!
//! Sequence: update the remote, check out `remote/branch`, branch a staging
//! branch from it, run `patch -p<strip>`, commit everything, restore the
//! original branch. [`PatchApplied::push`] then publishes
//! `<staging>:<branch>`.

use std::path::Path;

use crate::core::types::{BranchName, Oid, RefSpec, RemoteRef};
use crate::git::GitPort;

use super::guard::{delete_staging_branch, BranchGuard};
use super::EngineError;

/// Pending patch application.
#[derive(Debug)]
pub struct PatchApplier<'g, G: GitPort + ?Sized> {
    git: &'g G,
    target: RemoteRef,
    keep_temp_branches: bool,
}

impl<'g, G: GitPort + ?Sized> PatchApplier<'g, G> {
    pub fn new(git: &'g G, target: RemoteRef) -> Self {
        Self {
            git,
            target,
            keep_temp_branches: false,
        }
    }

    pub fn keep_temp_branches(mut self, keep: bool) -> Self {
        self.keep_temp_branches = keep;
        self
    }

    /// Apply `patch_file` and commit it on a staging branch.
    ///
    /// Consumes the applier; the returned [`PatchApplied`] is the only way
    /// to push. Applying twice does not compile:
    ///
    /// ```compile_fail
    /// use std::path::Path;
    ///
    /// use gitferry::core::types::RemoteRef;
    /// use gitferry::engine::PatchApplier;
    /// use gitferry::git::mock::MockGit;
    ///
    /// let git = MockGit::new();
    /// let target = RemoteRef::parse("upstream", "main").unwrap();
    /// let applier = PatchApplier::new(&git, target);
    /// let _ = applier.apply(Path::new("fix.patch"), "Fix", 1);
    /// let _ = applier.apply(Path::new("fix.patch"), "Fix", 1);
    /// ```
    pub fn apply(
        self,
        patch_file: &Path,
        message: &str,
        strip_level: u32,
    ) -> Result<PatchApplied<'g, G>, EngineError> {
        if message.trim().is_empty() {
            return Err(EngineError::user("commit message cannot be empty"));
        }
        if !patch_file.is_file() {
            return Err(EngineError::user(format!(
                "patch file not found: {}",
                patch_file.display()
            )));
        }

        let git = self.git;
        git.guard_working_tree_ready()?;
        let mut guard = BranchGuard::acquire(git, !self.keep_temp_branches)?;

        git.remote_update(self.target.remote())?;
        git.checkout(&self.target.tracking(), false)?;
        let staging = git.create_temp_branch(self.target.branch().as_str())?;
        git.checkout(staging.as_str(), true)?;
        guard.track(&staging);

        git.apply_patch(patch_file, strip_level)?;
        let commit = git.commit_all(message)?;
        tracing::info!(target = %self.target, %staging, commit = commit.short(8), "patch committed");

        let original = guard.original().branch().cloned();
        guard.untrack(&staging);
        guard.release()?;

        Ok(PatchApplied {
            git,
            target: self.target,
            staging,
            commit,
            original,
            cleanup: !self.keep_temp_branches,
        })
    }
}

/// A committed patch, ready to push.
#[derive(Debug)]
pub struct PatchApplied<'g, G: GitPort + ?Sized> {
    git: &'g G,
    target: RemoteRef,
    staging: BranchName,
    commit: Oid,
    original: Option<BranchName>,
    cleanup: bool,
}

impl<G: GitPort + ?Sized> PatchApplied<'_, G> {
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    pub fn staging_branch(&self) -> &BranchName {
        &self.staging
    }

    pub fn target(&self) -> &RemoteRef {
        &self.target
    }

    /// Push `<staging>:<branch>` to the target remote.
    ///
    /// A failed push keeps the staging branch so the commit is not lost.
    pub fn push(mut self) -> Result<(), EngineError> {
        let refspec = RefSpec::new(self.staging.as_str(), self.target.branch().as_str())?;
        if let Err(e) = self.git.push_to_remote(self.target.remote(), &refspec, false) {
            self.cleanup = false;
            tracing::warn!(staging = %self.staging, "push failed, staging branch kept");
            return Err(e.into());
        }
        tracing::info!(target = %self.target, "patch pushed");
        Ok(())
    }
}

impl<G: GitPort + ?Sized> Drop for PatchApplied<'_, G> {
    fn drop(&mut self) {
        if self.cleanup {
            if let Err(e) = delete_staging_branch(self.git, &self.staging, self.original.as_ref()) {
                tracing::warn!(staging = %self.staging, error = %e, "could not delete staging branch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{FailOn, MockGit, MockOperation};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn patch_file() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "--- a/README\n+++ b/README\n@@ -1 +1 @@\n-old\n+new").unwrap();
        f
    }

    fn target() -> RemoteRef {
        RemoteRef::parse("origin", "2.0").unwrap()
    }

    #[test]
    fn applies_on_staging_branch_and_restores() {
        let git = MockGit::new().with_current_branch("dev");
        let file = patch_file();
        let applied = PatchApplier::new(&git, target())
            .apply(file.path(), "Apply fix", 1)
            .unwrap();

        assert_eq!(applied.staging_branch().as_str(), "ferry-tmp/2-0-1");
        assert_eq!(git.head().as_deref(), Some("dev"));

        let ops = git.operations();
        assert_eq!(ops[0], MockOperation::RemoteUpdate { remote: "origin".into() });
        assert_eq!(
            ops[1],
            MockOperation::Checkout {
                refname: "origin/2.0".into(),
                create_new: false
            }
        );
        assert!(ops.contains(&MockOperation::ApplyPatch {
            patch_file: file.path().to_path_buf(),
            strip_level: 1
        }));
        assert!(ops.contains(&MockOperation::Commit {
            message: "Apply fix".into()
        }));
    }

    #[test]
    fn push_targets_remote_branch_then_cleans_up() {
        let git = MockGit::new();
        let file = patch_file();
        let applied = PatchApplier::new(&git, target())
            .apply(file.path(), "Apply fix", 1)
            .unwrap();
        applied.push().unwrap();

        assert_eq!(
            git.pushes(),
            vec![("origin".into(), "ferry-tmp/2-0-1:2.0".into(), false)]
        );
        assert!(git.temp_branches().is_empty());
    }

    #[test]
    fn keep_temp_branches_survives() {
        let git = MockGit::new();
        let file = patch_file();
        PatchApplier::new(&git, target())
            .keep_temp_branches(true)
            .apply(file.path(), "Apply fix", 1)
            .unwrap()
            .push()
            .unwrap();
        assert_eq!(git.temp_branches(), vec!["ferry-tmp/2-0-1".to_string()]);
    }

    #[test]
    fn failed_patch_restores_and_cleans_up() {
        let git = MockGit::new().with_current_branch("dev").fail_on(FailOn::ApplyPatch);
        let file = patch_file();
        let err = PatchApplier::new(&git, target())
            .apply(file.path(), "Apply fix", 1)
            .unwrap_err();

        assert!(matches!(err, EngineError::Git(_)));
        assert_eq!(git.head().as_deref(), Some("dev"));
        assert!(git.temp_branches().is_empty());
        assert!(git.pushes().is_empty());
    }

    #[test]
    fn failed_push_keeps_staging_branch() {
        let git = MockGit::new().fail_on(FailOn::Push);
        let file = patch_file();
        let applied = PatchApplier::new(&git, target())
            .apply(file.path(), "Apply fix", 1)
            .unwrap();
        assert!(applied.push().is_err());
        assert_eq!(git.temp_branches().len(), 1);
    }

    #[test]
    fn dirty_tree_rejected_before_mutation() {
        let git = MockGit::new().dirty();
        let file = patch_file();
        let err = PatchApplier::new(&git, target())
            .apply(file.path(), "Apply fix", 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
        assert!(git.operations().is_empty());
    }

    #[test]
    fn missing_patch_file_rejected() {
        let git = MockGit::new();
        let err = PatchApplier::new(&git, target())
            .apply(Path::new("/nonexistent/fix.patch"), "Apply fix", 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::User(_)));
    }
}
