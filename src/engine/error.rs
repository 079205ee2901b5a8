//! engine::error
//!
//! Error taxonomy for orchestration operations.
//!
//! | Variant | Raised when | Mutation before? |
//! |---|---|---|
//! | `User` | a precondition is violated | never |
//! | `Policy` | the workflow policy denies a merge | never |
//! | `CannotSquashMultipleAuthors` | squash across authors without override | staging only |
//! | `MergeWorkflow` | target drifted and realignment failed or was refused | staging only |
//! | `Git` | an external command failed | possibly |
//! | `Invariant` | a programming error was detected | never |
//!
//! Nothing is retried. The only automatic recovery is the rebase (or merge)
//! abort issued before a failing step's error is returned.

use thiserror::Error;

use crate::core::policy::PolicyViolation;
use crate::core::types::TypeError;
use crate::git::GitError;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Precondition violated by the user.
    #[error("{0}")]
    User(String),

    /// Merge denied by the workflow policy.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Squash requested over commits by several authors.
    #[error("cannot squash '{branch}': its commits have multiple authors ({})", .authors.join(", "))]
    CannotSquashMultipleAuthors {
        branch: String,
        authors: Vec<String>,
    },

    /// Target history drifted and could not (or may not) be realigned.
    #[error("{message}")]
    MergeWorkflow {
        message: String,
        #[source]
        source: Option<GitError>,
    },

    /// An external command failed.
    #[error(transparent)]
    Git(GitError),

    /// Programming error.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    pub fn user(message: impl std::fmt::Display) -> Self {
        EngineError::User(message.to_string())
    }
}

impl From<GitError> for EngineError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Type(e) => e.into(),
            GitError::DirtyWorktree { .. }
            | GitError::OperationInProgress { .. }
            | GitError::BranchNotFound { .. }
            | GitError::RemoteBranchNotFound { .. } => EngineError::User(err.to_string()),
            other => EngineError::Git(other),
        }
    }
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::EmptyRefSpec { .. } => EngineError::Invariant(err.to_string()),
            other => EngineError::User(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_worktree_is_user_error() {
        let err: EngineError = GitError::DirtyWorktree {
            details: "1 staged".into(),
        }
        .into();
        assert!(matches!(err, EngineError::User(_)));
    }

    #[test]
    fn empty_refspec_is_invariant() {
        let err: EngineError = TypeError::EmptyRefSpec {
            remote: "dev".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Invariant(_)));
    }

    #[test]
    fn process_failure_stays_git() {
        let err: EngineError = GitError::Process {
            command: "git push".into(),
            stderr: "rejected".into(),
            exit_code: Some(1),
        }
        .into();
        assert!(matches!(err, EngineError::Git(_)));
    }

    #[test]
    fn merge_workflow_chains_cause() {
        use std::error::Error as _;

        let err = EngineError::MergeWorkflow {
            message: "could not realign".into(),
            source: Some(GitError::Process {
                command: "git rebase".into(),
                stderr: "CONFLICT".into(),
                exit_code: Some(1),
            }),
        };
        assert!(err.source().is_some());
    }
}
