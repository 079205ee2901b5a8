//! core::policy
//!
//! Workflow policy: which branch may be merged into which.
//!
//! # Evaluation
//!
//! A merge `source -> target` is judged in three layers:
//!
//! 1. The preset ([`PolicyPreset::Semver`] or [`PolicyPreset::GitFlow`]),
//!    skipped entirely for [`PolicyPreset::None`].
//! 2. The explicit branch map: if it has an entry for `source`, `target`
//!    must be one of the listed targets.
//! 3. If neither layer produced a verdict, [`UnknownBranchPolicy`].
//!
//! How layers 1 and 2 combine is governed by [`MapPrecedence`]:
//!
//! - `Restrict` (default): the map can only narrow what the preset allows.
//!   Any denial stands.
//! - `Override`: a map entry for the source decides outright, even
//!   against a preset denial.
//!
//! Validation is pure. It runs before any repository mutation.
//!
//! # Example
//!
//! ```
//! use gitferry::core::policy::{PolicyPreset, WorkflowPolicy};
//!
//! let policy = WorkflowPolicy::new(PolicyPreset::Semver);
//! assert!(policy.validate("1.2", "2.0").is_ok());
//! assert!(policy.validate("2.0", "1.2").is_err());
//! assert!(policy.validate("develop", "master").is_ok());
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in branching models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyPreset {
    #[default]
    None,
    /// Version branches may only be merged forward (older into newer).
    Semver,
    /// The fixed git-flow transitions.
    GitFlow,
}

/// Verdict when no rule applies to a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownBranchPolicy {
    #[default]
    Allow,
    Deny,
}

/// How the explicit branch map combines with the preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapPrecedence {
    #[default]
    Restrict,
    Override,
}

/// The rule that rejected a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRule {
    /// Semver: source version is newer than the target.
    SemverBackport,
    /// Semver: source and target are the same version.
    SemverSameVersion,
    /// GitFlow: the pair is not one of the permitted transitions.
    GitFlowTransition,
    /// Branch map: the target is not listed for the source.
    BranchMap { allowed: Vec<String> },
    /// No rule matched and unknown branches are denied.
    UnknownBranch,
}

impl std::fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyRule::SemverBackport => {
                f.write_str("semver: merging a newer version into an older one is not allowed")
            }
            PolicyRule::SemverSameVersion => {
                f.write_str("semver: source and target are the same version")
            }
            PolicyRule::GitFlowTransition => f.write_str("git-flow: transition not permitted"),
            PolicyRule::BranchMap { allowed } if allowed.is_empty() => {
                f.write_str("branch map: no targets allowed")
            }
            PolicyRule::BranchMap { allowed } => {
                write!(f, "branch map: allowed targets are {}", allowed.join(", "))
            }
            PolicyRule::UnknownBranch => f.write_str("unknown branches are denied"),
        }
    }
}

/// A merge denied by the workflow policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("merging '{source_branch}' into '{target}' is not allowed ({rule})")]
pub struct PolicyViolation {
    pub source_branch: String,
    pub target: String,
    pub rule: PolicyRule,
}

/// Outcome of a single policy layer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Allow,
    Deny(PolicyRule),
}

/// A configured workflow policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowPolicy {
    pub preset: PolicyPreset,
    pub branches: BTreeMap<String, BTreeSet<String>>,
    pub unknown_branch_policy: UnknownBranchPolicy,
    pub map_precedence: MapPrecedence,
}

impl WorkflowPolicy {
    pub fn new(preset: PolicyPreset) -> Self {
        Self {
            preset,
            ..Default::default()
        }
    }

    /// Add an explicit `source -> targets` entry.
    pub fn allow<I, S>(mut self, source: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches
            .entry(source.to_string())
            .or_default()
            .extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn unknown_branches(mut self, policy: UnknownBranchPolicy) -> Self {
        self.unknown_branch_policy = policy;
        self
    }

    pub fn map_precedence(mut self, precedence: MapPrecedence) -> Self {
        self.map_precedence = precedence;
        self
    }

    /// Check whether merging `source` into `target` is permitted.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyViolation`] naming the rule that rejected the pair.
    pub fn validate(&self, source: &str, target: &str) -> Result<(), PolicyViolation> {
        let preset = match self.preset {
            PolicyPreset::None => None,
            PolicyPreset::Semver => Some(semver_verdict(source, target)),
            PolicyPreset::GitFlow => Some(git_flow_verdict(source, target)),
        };
        let mapped = self.map_verdict(source, target);

        let verdict = match (self.map_precedence, preset, mapped) {
            (MapPrecedence::Override, _, Some(m)) => m,
            (_, Some(Verdict::Deny(rule)), _) | (_, _, Some(Verdict::Deny(rule))) => {
                Verdict::Deny(rule)
            }
            (_, Some(Verdict::Allow), _) | (_, _, Some(Verdict::Allow)) => Verdict::Allow,
            (_, None, None) => match self.unknown_branch_policy {
                UnknownBranchPolicy::Allow => Verdict::Allow,
                UnknownBranchPolicy::Deny => Verdict::Deny(PolicyRule::UnknownBranch),
            },
        };

        match verdict {
            Verdict::Allow => Ok(()),
            Verdict::Deny(rule) => {
                tracing::debug!(source, target, %rule, "workflow policy denied merge");
                Err(PolicyViolation {
                    source_branch: source.to_string(),
                    target: target.to_string(),
                    rule,
                })
            }
        }
    }

    fn map_verdict(&self, source: &str, target: &str) -> Option<Verdict> {
        let allowed = self.branches.get(source)?;
        if allowed.contains(target) {
            Some(Verdict::Allow)
        } else {
            Some(Verdict::Deny(PolicyRule::BranchMap {
                allowed: allowed.iter().cloned().collect(),
            }))
        }
    }
}

/// Parse a branch name as a dotted numeric version (`1`, `1.2`, `v2.0.1`).
///
/// Trailing zero components are insignificant, so `1.2` and `1.2.0` compare equal.
fn parse_version(name: &str) -> Option<Vec<u64>> {
    let digits = name.strip_prefix('v').unwrap_or(name);
    let mut parts = digits
        .split('.')
        .map(|p| {
            if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) {
                p.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect::<Option<Vec<_>>>()?;
    while parts.len() > 1 && parts.last() == Some(&0) {
        parts.pop();
    }
    Some(parts)
}

fn semver_verdict(source: &str, target: &str) -> Verdict {
    let (Some(src), Some(dst)) = (parse_version(source), parse_version(target)) else {
        // Non-version branches (master, develop, ...) are exempt.
        return Verdict::Allow;
    };
    match src.cmp(&dst) {
        Ordering::Less => Verdict::Allow,
        Ordering::Equal => Verdict::Deny(PolicyRule::SemverSameVersion),
        Ordering::Greater => Verdict::Deny(PolicyRule::SemverBackport),
    }
}

fn git_flow_verdict(source: &str, target: &str) -> Verdict {
    let kind = |name: &str| -> &'static str {
        match name {
            "develop" => "develop",
            "master" => "master",
            _ if name.starts_with("feature/") => "feature",
            _ if name.starts_with("release/") => "release",
            _ if name.starts_with("hotfix/") => "hotfix",
            _ => "other",
        }
    };

    let permitted = matches!(
        (kind(source), kind(target)),
        ("feature", "develop")
            | ("develop", "release")
            | ("develop", "master")
            | ("release", "master")
            | ("release", "develop")
            | ("hotfix", "master")
            | ("hotfix", "develop")
    );
    if permitted {
        Verdict::Allow
    } else {
        Verdict::Deny(PolicyRule::GitFlowTransition)
    }
}
