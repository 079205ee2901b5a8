//! core::naming
//!
//! Names for the ephemeral staging branches created by merge and patch
//! operations.
//!
//! Staging branches are named `ferry-tmp/<slug>-<suffix>`, where `slug` is
//! derived from the branch being staged and `suffix` is random, so two
//! operations seeded from the same branch never collide.

use uuid::Uuid;

use super::types::{BranchName, TypeError};

/// Prefix shared by every staging branch.
pub const TEMP_BRANCH_PREFIX: &str = "ferry-tmp/";

/// Reduce an arbitrary branch name to a flat, branch-safe slug.
///
/// # Example
///
/// ```
/// use gitferry::core::naming::slugify;
///
/// assert_eq!(slugify("release/2.0"), "release-2-0");
/// assert_eq!(slugify("Feature/Add_Login"), "feature-add-login");
/// ```
pub fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(40)
        .collect()
}

/// Build a unique staging branch name seeded from `seed`.
pub fn temp_branch_name(seed: &str) -> Result<BranchName, TypeError> {
    let slug = slugify(seed);
    let slug = if slug.is_empty() { "branch".to_string() } else { slug };
    let suffix = Uuid::new_v4().simple().to_string();
    BranchName::new(format!("{TEMP_BRANCH_PREFIX}{slug}-{}", &suffix[..12]))
}

/// Whether a branch name was produced by [`temp_branch_name`].
pub fn is_temp_branch(name: &str) -> bool {
    name.starts_with(TEMP_BRANCH_PREFIX)
}
