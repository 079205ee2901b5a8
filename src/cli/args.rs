//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{Realignment, SyncStrategy};

/// Ferry - sync, merge and patch Git branches across remotes
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if ferry was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging (FERRY_LOG overrides)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring a local branch up to date with a remote and republish it
    #[command(
        name = "branch:sync",
        long_about = "Bring a local branch up to date with a source remote and republish it \
            to a destination remote.\n\n\
            The local branch is compared with <SOURCE_REMOTE>/<SOURCE_BRANCH>:\n  \
            up to date: nothing happens\n  \
            behind: the remote changes are integrated\n  \
            ahead: the branch is pushed to the destination\n  \
            diverged: the remote changes are integrated, then the branch is pushed",
        after_help = "\
EXAMPLES:
    # Sync the current branch from upstream, publish to origin
    ferry branch:sync

    # Sync dev, integrating with merge commits instead of rebasing
    ferry branch:sync dev --strategy smart-merge

    # Throw away local commits on dev
    ferry branch:sync dev --strategy force"
    )]
    BranchSync {
        /// Local branch to sync (default: current branch)
        source_branch: Option<String>,

        /// Remote to pull from (default: upstream)
        source_remote: Option<String>,

        /// Remote to publish to (default: origin)
        dest_remote: Option<String>,

        /// Branch to publish to (default: same as the local branch)
        dest_branch: Option<String>,

        /// How to integrate remote changes
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Force-push after integrating diverged history
        #[arg(long, conflicts_with = "no_push")]
        force_push: bool,

        /// Never push
        #[arg(long)]
        no_push: bool,
    },

    /// Merge one remote branch into another and push the result
    #[command(
        name = "branch:merge",
        long_about = "Merge a source remote branch into a target remote branch.\n\n\
            Both branches are staged on temporary local branches, so the working \
            branch is never touched. The merge is checked against the configured \
            workflow policy first.",
        after_help = "\
EXAMPLES:
    # Forward-port 1.0 into 2.0
    ferry branch:merge 1.0 2.0

    # Squash a feature branch from a contributor's fork into develop
    ferry branch:merge feature/login develop --squash --source-org alice

    # Refuse if 2.0 has moved since 1.0 forked
    ferry branch:merge 1.0 2.0 --realign guard"
    )]
    BranchMerge {
        /// Branch to merge from
        source_branch: String,

        /// Branch to merge into
        target_branch: String,

        /// Squash the source commits into one before merging
        #[arg(long)]
        squash: bool,

        /// Squash even when the commits have several authors
        #[arg(long, requires = "squash")]
        force_squash: bool,

        /// Only fast-forward; never create a merge commit
        #[arg(long, conflicts_with_all = ["squash"])]
        fast_forward: bool,

        /// Merge commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Skip the workflow policy check
        #[arg(long)]
        ignore_workflow: bool,

        /// Fetch the source branch from this organization's fork
        #[arg(long, value_name = "ORG")]
        source_org: Option<String>,

        /// Repository name of the fork (default: same as the target)
        #[arg(long, value_name = "REPO", requires = "source_org")]
        source_repo: Option<String>,

        /// Remote holding the source branch
        #[arg(long, conflicts_with = "source_org")]
        source_remote: Option<String>,

        /// Remote holding the target branch
        #[arg(long)]
        target_remote: Option<String>,

        /// Merge into this branch instead, moving the source commits onto it
        #[arg(long, value_name = "BRANCH")]
        switch_base: Option<String>,

        /// What to do when the target moved since the source forked
        #[arg(long, value_enum)]
        realign: Option<RealignArg>,

        /// Do not append a commit summary to the merge message
        #[arg(long)]
        no_log: bool,

        /// Keep the staging branches
        #[arg(long)]
        keep_temp: bool,

        /// Merge locally without pushing
        #[arg(long)]
        no_push: bool,
    },

    /// Apply a patch file to a remote branch and push it
    #[command(
        name = "patch:apply",
        after_help = "\
EXAMPLES:
    # Apply a fix to origin/2.0
    ferry patch:apply fix.patch origin 2.0 -m \"Fix crash on empty input\""
    )]
    PatchApply {
        /// Unified diff to apply
        patch_file: PathBuf,

        /// Remote holding the branch
        remote: String,

        /// Branch to patch
        branch: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Leading path components to strip (patch -p)
        #[arg(short = 'p', long, default_value_t = 1)]
        strip: u32,

        /// Keep the staging branch
        #[arg(long)]
        keep_temp: bool,

        /// Commit locally without pushing
        #[arg(long)]
        no_push: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    ferry completion bash > ~/.local/share/bash-completion/completions/ferry

    # Zsh
    ferry completion zsh > ~/.zfunc/_ferry"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Sync strategy argument.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg {
    /// Hard-reset to the remote; never push
    Force,
    /// Rebase onto the remote
    Smart,
    /// Merge the remote without fast-forwarding
    SmartMerge,
}

impl From<StrategyArg> for SyncStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Force => SyncStrategy::Force,
            StrategyArg::Smart => SyncStrategy::Smart,
            StrategyArg::SmartMerge => SyncStrategy::SmartMerge,
        }
    }
}

/// Realignment argument.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum RealignArg {
    /// Merge anyway
    None,
    /// Rebase the source onto the target
    Rebase,
    /// Refuse to merge
    Guard,
}

impl From<RealignArg> for Realignment {
    fn from(arg: RealignArg) -> Self {
        match arg {
            RealignArg::None => Realignment::None,
            RealignArg::Rebase => Realignment::Rebase,
            RealignArg::Guard => Realignment::Guard,
        }
    }
}

/// Shell for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
