//! engine::rebase
//!
//! A single rebase attempt with guaranteed abort on failure.

use crate::git::{GitError, GitPort};

/// One-shot rebase.
///
/// Runs `git rebase <base> [<branch>]`, or
/// `git rebase --onto <new-base> <base> [<branch>]` when [`onto`] is set.
/// If the rebase fails, `git rebase --abort` is issued before the original
/// error is returned, so the working tree is never left mid-rebase.
///
/// [`onto`]: RebaseExecutor::onto
///
/// # Example
///
/// ```
/// use gitferry::engine::RebaseExecutor;
/// use gitferry::git::mock::{MockGit, MockOperation};
///
/// let git = MockGit::new();
/// RebaseExecutor::new(&git, "upstream/dev").perform().unwrap();
///
/// assert_eq!(
///     git.operations(),
///     vec![MockOperation::Command { args: vec!["rebase".into(), "upstream/dev".into()] }]
/// );
/// ```
#[derive(Debug)]
pub struct RebaseExecutor<'g, G: GitPort + ?Sized> {
    git: &'g G,
    base: String,
    onto: Option<String>,
    branch: Option<String>,
}

impl<'g, G: GitPort + ?Sized> RebaseExecutor<'g, G> {
    pub fn new(git: &'g G, base: impl Into<String>) -> Self {
        Self {
            git,
            base: base.into(),
            onto: None,
            branch: None,
        }
    }

    /// Transplant the commits after `base` onto `new_base`.
    pub fn onto(mut self, new_base: impl Into<String>) -> Self {
        self.onto = Some(new_base.into());
        self
    }

    /// Rebase `branch` instead of the checked-out branch.
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    fn args(&self) -> Vec<&str> {
        let mut args = vec!["rebase"];
        if let Some(onto) = &self.onto {
            args.extend(["--onto", onto.as_str()]);
        }
        args.push(&self.base);
        if let Some(branch) = &self.branch {
            args.push(branch);
        }
        args
    }

    pub fn perform(self) -> Result<(), GitError> {
        let args = self.args();
        match self.git.run_command(&args) {
            Ok(_) => {
                tracing::info!(base = %self.base, onto = ?self.onto, branch = ?self.branch, "rebased");
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, "rebase failed, aborting");
                if let Err(abort) = self.git.run_command(&["rebase", "--abort"]) {
                    tracing::warn!(error = %abort, "rebase --abort failed");
                }
                Err(err)
            }
        }
    }
}
