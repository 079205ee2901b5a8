//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository and loads configuration
//! 2. Resolves defaults (flags override config, config overrides built-ins)
//! 3. Builds one engine operation, performs it, then pushes
//! 4. Formats and displays output
//!
//! Handlers do NOT perform repository mutations directly; the one exception
//! is registering a fork remote for `branch:merge --source-org`.

mod completion;
mod merge;
mod patch;
mod sync;

pub use completion::completion;
pub use merge::{fork_url, merge, MergeOptions};
pub use patch::{patch_apply, PatchOptions};
pub use sync::{sync, SyncArgs};

use anyhow::{Context as _, Result};

use super::args::Command;
use crate::core::config::{Config, ConfigLoadResult};
use crate::engine::Context;
use crate::git::Git;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::BranchSync {
            source_branch,
            source_remote,
            dest_remote,
            dest_branch,
            strategy,
            force_push,
            no_push,
        } => sync(
            ctx,
            SyncArgs {
                source_branch,
                source_remote,
                dest_remote,
                dest_branch,
                strategy: strategy.map(Into::into),
                force_push,
                no_push,
            },
        ),
        Command::BranchMerge {
            source_branch,
            target_branch,
            squash,
            force_squash,
            fast_forward,
            message,
            ignore_workflow,
            source_org,
            source_repo,
            source_remote,
            target_remote,
            switch_base,
            realign,
            no_log,
            keep_temp,
            no_push,
        } => merge(
            ctx,
            MergeOptions {
                source_branch,
                target_branch,
                squash,
                force_squash,
                fast_forward,
                message,
                ignore_workflow,
                source_org,
                source_repo,
                source_remote,
                target_remote,
                switch_base,
                realign: realign.map(Into::into),
                no_log,
                keep_temp,
                no_push,
            },
        ),
        Command::PatchApply {
            patch_file,
            remote,
            branch,
            message,
            strip,
            keep_temp,
            no_push,
        } => patch_apply(
            ctx,
            PatchOptions {
                patch_file,
                remote,
                branch,
                message,
                strip,
                keep_temp,
                no_push,
            },
        ),
        Command::Completion { shell } => completion(shell),
    }
}

/// An opened repository with its configuration applied.
pub(crate) struct Session {
    pub git: Git,
    pub config: Config,
}

/// Open the repository around the working directory and load its config.
pub(crate) fn open_session(ctx: &Context) -> Result<Session> {
    let dir = ctx
        .work_dir()
        .context("could not determine the working directory")?;
    let git = Git::open(&dir)?;

    let ConfigLoadResult { config, warnings } =
        Config::load(Some(git.work_dir())).context("failed to load configuration")?;
    for warning in warnings {
        output::warn(&warning.message, ctx.verbosity());
    }

    let git = git.with_timeout(config.git_timeout());
    Ok(Session { git, config })
}
