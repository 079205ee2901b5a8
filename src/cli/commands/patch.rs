//! cli::commands::patch
//!
//! `patch:apply`: apply a patch file to a remote branch and push it.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::types::RemoteRef;
use crate::engine::{Context, PatchApplier};
use crate::ui::output;

use super::open_session;

/// Parsed `patch:apply` arguments.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    pub patch_file: PathBuf,
    pub remote: String,
    pub branch: String,
    pub message: String,
    pub strip: u32,
    pub keep_temp: bool,
    pub no_push: bool,
}

/// Run the patch command.
pub fn patch_apply(ctx: &Context, opts: PatchOptions) -> Result<()> {
    let session = open_session(ctx)?;
    let verbosity = ctx.verbosity();

    // Relative paths are relative to where ferry was started, not --cwd.
    let patch_file = std::path::absolute(&opts.patch_file)?;
    let target = RemoteRef::parse(&opts.remote, &opts.branch)?;
    let keep_temp = opts.keep_temp || opts.no_push || session.config.keep_temp_branches();

    let applied = PatchApplier::new(&session.git, target)
        .keep_temp_branches(keep_temp)
        .apply(&patch_file, &opts.message, opts.strip)?;

    output::print(
        format!(
            "Applied {} on {} ({})",
            opts.patch_file.display(),
            applied.target(),
            applied.commit().short(8)
        ),
        verbosity,
    );

    if opts.no_push {
        output::print(
            format!("Not pushed; the commit is on '{}'", applied.staging_branch()),
            verbosity,
        );
        return Ok(());
    }

    let target = applied.target().clone();
    applied.push()?;
    output::print(format!("Pushed to {}", target), verbosity);
    Ok(())
}
