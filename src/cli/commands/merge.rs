//! cli::commands::merge
//!
//! `branch:merge`: merge a source remote branch into a target remote branch.
//!
//! # Design
//!
//! The workflow policy is checked before anything touches the repository
//! (skip with `--ignore-workflow`). The effective target, which is the
//! switch base when one is given, is what the policy sees.
//!
//! With `--source-org`, the source branch is fetched from a fork: a remote
//! named after the organization is added (an existing one is reused), its
//! URL derived from the target remote's URL.
//!
//! # Example
//!
//! ```bash
//! ferry branch:merge 1.0 2.0
//! ferry branch:merge feature/login develop --squash --source-org alice
//! ```

use anyhow::{Context as _, Result};

use crate::core::types::{BranchName, Realignment, RemoteRef};
use crate::engine::{Context, EngineError, MergeMessage, MergeOrchestrator, MergeSpec};
use crate::git::GitPort;
use crate::ui::output;

use super::open_session;

/// Parsed `branch:merge` arguments.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub source_branch: String,
    pub target_branch: String,
    pub squash: bool,
    pub force_squash: bool,
    pub fast_forward: bool,
    pub message: Option<String>,
    pub ignore_workflow: bool,
    pub source_org: Option<String>,
    pub source_repo: Option<String>,
    pub source_remote: Option<String>,
    pub target_remote: Option<String>,
    pub switch_base: Option<String>,
    pub realign: Option<Realignment>,
    pub no_log: bool,
    pub keep_temp: bool,
    pub no_push: bool,
}

/// Run the merge command.
pub fn merge(ctx: &Context, opts: MergeOptions) -> Result<()> {
    let session = open_session(ctx)?;
    let git = &session.git;
    let config = &session.config;
    let verbosity = ctx.verbosity();

    let source_branch = BranchName::new(opts.source_branch.as_str())?;
    let target_branch = BranchName::new(opts.target_branch.as_str())?;
    let switch_base = opts
        .switch_base
        .as_deref()
        .map(BranchName::new)
        .transpose()?;

    if !opts.ignore_workflow {
        let effective = switch_base.as_ref().unwrap_or(&target_branch);
        config
            .workflow_policy()
            .validate(source_branch.as_str(), effective.as_str())
            .map_err(EngineError::from)?;
    }

    let target_remote = opts
        .target_remote
        .clone()
        .unwrap_or_else(|| config.merge_remote());
    let source_remote = match &opts.source_org {
        Some(org) => {
            let base = git
                .run_command(&["remote", "get-url", &target_remote])
                .with_context(|| format!("could not read the URL of remote '{}'", target_remote))?;
            let url = fork_url(base.trim(), org, opts.source_repo.as_deref())
                .with_context(|| format!("cannot derive a fork URL from '{}'", base.trim()))?;
            git.add_remote(org, &url)?;
            org.clone()
        }
        None => opts
            .source_remote
            .clone()
            .unwrap_or_else(|| target_remote.clone()),
    };

    let spec = MergeSpec {
        source: RemoteRef::new(source_remote, source_branch)?,
        target: RemoteRef::new(target_remote, target_branch)?,
        switch_base,
        squash: opts.squash,
        force_squash: opts.force_squash,
        message: match &opts.message {
            Some(text) => MergeMessage::Literal(text.clone()),
            None => MergeMessage::standard(),
        },
        append_log: !opts.no_log && !opts.fast_forward && config.merge_append_log(),
        fast_forward: opts.fast_forward,
        realignment: opts.realign.unwrap_or_else(|| config.merge_realign()),
        keep_temp_branches: opts.keep_temp || opts.no_push || config.keep_temp_branches(),
    };

    let completed = MergeOrchestrator::from_spec(git, spec)
        .perform()
        .inspect_err(|e| {
            if matches!(e, EngineError::CannotSquashMultipleAuthors { .. }) {
                output::hint("re-run with --force-squash to squash anyway");
            }
        })?;

    output::print(
        format!(
            "Merged {} into {} ({})",
            opts.source_branch,
            completed.target(),
            completed.commit().short(8)
        ),
        verbosity,
    );

    if opts.no_push {
        output::print(
            format!("Not pushed; the result is on '{}'", completed.staging_branch()),
            verbosity,
        );
        return Ok(());
    }

    let target = completed.target().clone();
    completed.push()?;
    output::print(format!("Pushed to {}", target), verbosity);
    Ok(())
}

/// The URL of `org`'s fork of the repository at `url`.
///
/// Replaces the owner (and, when given, the repository name) in SSH
/// (`git@host:owner/repo.git`) and URL (`https://host/owner/repo`) forms.
///
/// ```
/// use gitferry::cli::commands::fork_url;
///
/// assert_eq!(
///     fork_url("git@github.com:acme/widgets.git", "alice", None).as_deref(),
///     Some("git@github.com:alice/widgets.git")
/// );
/// assert_eq!(
///     fork_url("https://github.com/acme/widgets", "alice", Some("gadgets")).as_deref(),
///     Some("https://github.com/alice/gadgets")
/// );
/// ```
pub fn fork_url(url: &str, org: &str, repo: Option<&str>) -> Option<String> {
    let (path, suffix) = match url.strip_suffix(".git") {
        Some(stripped) => (stripped, ".git"),
        None => (url.trim_end_matches('/'), ""),
    };
    let (owner_path, current_repo) = path.rsplit_once('/')?;
    let owner_start = owner_path.rfind(['/', ':'])? + 1;
    let prefix = &owner_path[..owner_start];
    if current_repo.is_empty() || owner_path[owner_start..].is_empty() {
        return None;
    }

    Some(format!(
        "{}{}/{}{}",
        prefix,
        org,
        repo.unwrap_or(current_repo),
        suffix
    ))
}
