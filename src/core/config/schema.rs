//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$FERRY_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ferry/config.toml`
//! 3. `~/.ferry/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/ferry/config.toml` (canonical) or `.ferry.toml` in the
//! work tree root (shared with the project).
//!
//! # Validation
//!
//! Config values are validated after parsing: branch names must be valid,
//! remotes non-empty, timeouts positive.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::policy::{MapPrecedence, PolicyPreset, UnknownBranchPolicy, WorkflowPolicy};
use crate::core::types::{BranchName, Realignment, SyncStrategy};

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [git]
/// timeout_secs = 3600
///
/// [sync]
/// strategy = "smart"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Child process settings
    pub git: Option<GitSettings>,

    /// Sync defaults
    pub sync: Option<SyncDefaults>,

    /// Merge defaults
    pub merge: Option<MergeDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(git) = &self.git {
            git.validate()?;
        }
        if let Some(sync) = &self.sync {
            sync.validate()?;
        }
        if let Some(merge) = &self.merge {
            merge.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// [workflow]
/// preset = "semver"
/// unknown_branch_policy = "deny"
///
/// [workflow.branches]
/// "1.0" = ["1.1", "2.0"]
///
/// [merge]
/// realign = "guard"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Merge policy
    pub workflow: Option<WorkflowConfig>,

    /// Sync defaults (override global)
    pub sync: Option<SyncDefaults>,

    /// Merge defaults (override global)
    pub merge: Option<MergeDefaults>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(workflow) = &self.workflow {
            workflow.validate()?;
        }
        if let Some(sync) = &self.sync {
            sync.validate()?;
        }
        if let Some(merge) = &self.merge {
            merge.validate()?;
        }
        Ok(())
    }
}

/// Child process settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitSettings {
    /// Wall-clock limit for a single git or patch invocation
    pub timeout_secs: Option<u64>,
}

impl GitSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "git.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The `[workflow]` policy block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Built-in branching model
    pub preset: Option<PolicyPreset>,

    /// Source branch -> allowed target branches
    pub branches: BTreeMap<String, BTreeSet<String>>,

    /// Verdict when no rule applies
    pub unknown_branch_policy: Option<UnknownBranchPolicy>,

    /// Whether the branch map can override the preset
    pub map_precedence: Option<MapPrecedence>,
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = self
            .branches
            .iter()
            .flat_map(|(source, targets)| std::iter::once(source).chain(targets));
        for name in names {
            BranchName::new(name.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("workflow.branches: {}", e))
            })?;
        }
        Ok(())
    }

    /// Build the validator this block describes.
    pub fn to_policy(&self) -> WorkflowPolicy {
        WorkflowPolicy {
            preset: self.preset.unwrap_or_default(),
            branches: self.branches.clone(),
            unknown_branch_policy: self.unknown_branch_policy.unwrap_or_default(),
            map_precedence: self.map_precedence.unwrap_or_default(),
        }
    }
}

/// `branch:sync` defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncDefaults {
    /// Default strategy
    pub strategy: Option<SyncStrategy>,

    /// Remote to pull from (default: "upstream")
    pub source_remote: Option<String>,

    /// Remote to publish to (default: "origin")
    pub dest_remote: Option<String>,
}

impl SyncDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_remote("sync.source_remote", self.source_remote.as_deref())?;
        validate_remote("sync.dest_remote", self.dest_remote.as_deref())
    }
}

/// `branch:merge` defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeDefaults {
    /// Remote holding both branches (default: "upstream")
    pub remote: Option<String>,

    /// What to do when the target moved since the source forked
    pub realign: Option<Realignment>,

    /// Append a one-line-per-commit summary to merge commits
    pub append_log: Option<bool>,

    /// Keep staging branches after the operation
    pub keep_temp_branches: Option<bool>,
}

impl MergeDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_remote("merge.remote", self.remote.as_deref())
    }
}

fn validate_remote(key: &str, remote: Option<&str>) -> Result<(), ConfigError> {
    match remote {
        Some(r) if r.trim().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{} cannot be empty",
            key
        ))),
        _ => Ok(()),
    }
}
