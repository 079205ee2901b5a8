//! cli::commands::sync
//!
//! `branch:sync`: reconcile a local branch with a source remote and
//! republish it.
//!
//! # Defaults
//!
//! - branch: the checked-out branch
//! - source remote: `sync.source_remote`, else `upstream`
//! - destination remote: `sync.dest_remote`, else `origin`
//! - destination branch: the local branch name
//! - strategy: `sync.strategy`, else `smart`
//!
//! # Example
//!
//! ```bash
//! # Rebase dev onto upstream/dev, push to origin/dev if needed
//! ferry branch:sync dev
//!
//! # Sync from a fork into a differently named branch
//! ferry branch:sync dev upstream fork dev-mirror --force-push
//! ```

use anyhow::{Context as _, Result};

use crate::core::types::{BranchName, RemoteRef, SyncOptions, SyncStrategy};
use crate::engine::{BranchSyncEngine, Context};
use crate::git::GitPort;
use crate::ui::output;

use super::open_session;

/// Parsed `branch:sync` arguments.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub source_branch: Option<String>,
    pub source_remote: Option<String>,
    pub dest_remote: Option<String>,
    pub dest_branch: Option<String>,
    pub strategy: Option<SyncStrategy>,
    pub force_push: bool,
    pub no_push: bool,
}

impl SyncArgs {
    fn options(&self) -> SyncOptions {
        let mut options = SyncOptions::empty();
        options.set(SyncOptions::FORCE_PUSH, self.force_push);
        options.set(SyncOptions::DISABLE_PUSH, self.no_push);
        options
    }
}

/// Run the sync command.
pub fn sync(ctx: &Context, args: SyncArgs) -> Result<()> {
    let session = open_session(ctx)?;
    let git = &session.git;
    let config = &session.config;

    let local = match &args.source_branch {
        Some(name) => BranchName::new(name.as_str())?,
        None => git
            .current_branch()?
            .context("HEAD is detached; name the branch to sync")?,
    };
    let source_remote = args
        .source_remote
        .clone()
        .unwrap_or_else(|| config.sync_source_remote());
    let dest_remote = args
        .dest_remote
        .clone()
        .unwrap_or_else(|| config.sync_dest_remote());
    let dest_branch = match &args.dest_branch {
        Some(name) => BranchName::new(name.as_str())?,
        None => local.clone(),
    };
    let strategy = args.strategy.unwrap_or_else(|| config.sync_strategy());

    let outcome = BranchSyncEngine::new(git, local.clone())
        .source(RemoteRef::new(source_remote, local.clone())?)
        .destination(RemoteRef::new(dest_remote, dest_branch)?)
        .sync(strategy, args.options())?;

    output::print(
        output::format_sync_outcome(local.as_str(), &outcome),
        ctx.verbosity(),
    );
    Ok(())
}
