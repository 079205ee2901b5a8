//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RemoteRef`] - A branch on a specific remote
//! - [`RefSpec`] - A push refspec whose local side can never be empty
//! - [`SyncStatus`] - Relationship between a local and a remote branch
//! - [`SyncStrategy`] / [`SyncOptions`] - How a sync reconciles and publishes
//! - [`Realignment`] - How a merge treats a target that moved
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use gitferry::core::types::{BranchName, Oid, RefSpec, RemoteRef};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let remote = RemoteRef::new("upstream", branch.clone()).unwrap();
//! assert_eq!(remote.to_string(), "upstream/feature/my-branch");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(RefSpec::new("", "main").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid remote name: {0}")]
    InvalidRemoteName(String),

    /// A push refspec with an empty local side deletes the remote branch.
    #[error("refusing to build refspec ':{remote}' (empty local side would delete the remote branch)")]
    EmptyRefSpec { remote: String },

    #[error("sync options --no-push and --force-push are mutually exclusive")]
    ConflictingSyncOptions,
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use gitferry::core::types::BranchName;
///
/// let name = BranchName::new("release/2.0").unwrap();
/// assert_eq!(name.as_str(), "release/2.0");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("-flag").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}': {why}")));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return reject(&format!("branch name cannot contain '{bad}'"));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return reject(&format!("branch name cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for BranchName {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// # Example
///
/// ```
/// use gitferry::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64 character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("object id must be hexadecimal".into()));
        }
        Ok(Self(oid))
    }

    /// The zero/null OID.
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    /// Check if this is the zero/null OID.
    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// First `len` characters of the OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch on a specific remote.
///
/// Immutable once constructed; operations hold these by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteRef {
    remote: String,
    branch: BranchName,
}

impl RemoteRef {
    /// Create a remote ref.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRemoteName` if the remote name is empty or
    /// contains whitespace or a `/`.
    pub fn new(remote: impl Into<String>, branch: BranchName) -> Result<Self, TypeError> {
        let remote = remote.into();
        if remote.is_empty() || remote.contains('/') || remote.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidRemoteName(remote));
        }
        Ok(Self { remote, branch })
    }

    /// Parse a `remote` + `branch` pair of strings.
    pub fn parse(remote: &str, branch: &str) -> Result<Self, TypeError> {
        Self::new(remote, BranchName::new(branch)?)
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// The remote-tracking ref as git revision syntax (`remote/branch`).
    pub fn tracking(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    /// Same remote, different branch.
    pub fn with_branch(&self, branch: BranchName) -> Self {
        Self {
            remote: self.remote.clone(),
            branch,
        }
    }
}

impl std::fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remote, self.branch)
    }
}

/// A push refspec `local:remote`.
///
/// The local side is never empty: `:branch` instructs git to delete the
/// remote branch, so it is rejected at construction, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    local: String,
    remote: String,
}

impl RefSpec {
    /// Build a refspec.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::EmptyRefSpec` if `local` is empty or whitespace.
    ///
    /// # Example
    ///
    /// ```
    /// use gitferry::core::types::RefSpec;
    ///
    /// let spec = RefSpec::new("ferry-tmp-main-1a2b", "main").unwrap();
    /// assert_eq!(spec.to_string(), "ferry-tmp-main-1a2b:main");
    ///
    /// assert!(RefSpec::new("  ", "main").is_err());
    /// ```
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Result<Self, TypeError> {
        let local = local.into();
        let remote = remote.into();
        if local.trim().is_empty() {
            return Err(TypeError::EmptyRefSpec { remote });
        }
        Ok(Self { local, remote })
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }
}

impl std::fmt::Display for RefSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.local, self.remote)
    }
}

/// Relationship between a local branch and a remote branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Both point at the same commit.
    UpToDate,
    /// The remote has commits the local branch lacks.
    NeedPull,
    /// The local branch has commits the remote lacks.
    NeedPush,
    /// Both sides have commits the other lacks.
    Diverged,
}

impl SyncStatus {
    /// Derive the status from ahead/behind counts of local relative to remote.
    ///
    /// ```
    /// use gitferry::core::types::SyncStatus;
    ///
    /// assert_eq!(SyncStatus::from_counts(0, 0), SyncStatus::UpToDate);
    /// assert_eq!(SyncStatus::from_counts(0, 2), SyncStatus::NeedPull);
    /// assert_eq!(SyncStatus::from_counts(1, 0), SyncStatus::NeedPush);
    /// assert_eq!(SyncStatus::from_counts(1, 2), SyncStatus::Diverged);
    /// ```
    pub fn from_counts(ahead: usize, behind: usize) -> Self {
        match (ahead, behind) {
            (0, 0) => SyncStatus::UpToDate,
            (0, _) => SyncStatus::NeedPull,
            (_, 0) => SyncStatus::NeedPush,
            _ => SyncStatus::Diverged,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::UpToDate => "up to date",
            SyncStatus::NeedPull => "behind",
            SyncStatus::NeedPush => "ahead",
            SyncStatus::Diverged => "diverged",
        };
        f.write_str(s)
    }
}

/// How a sync integrates remote changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// Hard-reset the local branch to the source; never push.
    Force,
    /// Rebase onto the source.
    #[default]
    Smart,
    /// Merge the source without fast-forwarding.
    SmartMerge,
}

/// What a merge does when the target moved since the source branch forked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Realignment {
    /// Merge as-is.
    #[default]
    None,
    /// Rebase the source onto the current target before merging.
    #[serde(alias = "rebase-onto-base")]
    Rebase,
    /// Refuse to merge against drifted history.
    #[serde(alias = "guard-against-drift")]
    Guard,
}

bitflags::bitflags! {
    /// Push behavior flags for a sync.
    ///
    /// `DISABLE_PUSH` and `FORCE_PUSH` are mutually exclusive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyncOptions: u8 {
        const DISABLE_PUSH = 0b01;
        const FORCE_PUSH = 0b10;
    }
}

impl SyncOptions {
    /// Reject contradictory flag combinations.
    ///
    /// ```
    /// use gitferry::core::types::SyncOptions;
    ///
    /// assert!(SyncOptions::FORCE_PUSH.validate().is_ok());
    /// assert!((SyncOptions::FORCE_PUSH | SyncOptions::DISABLE_PUSH).validate().is_err());
    /// ```
    pub fn validate(self) -> Result<Self, TypeError> {
        if self.contains(SyncOptions::DISABLE_PUSH | SyncOptions::FORCE_PUSH) {
            return Err(TypeError::ConflictingSyncOptions);
        }
        Ok(self)
    }
}
