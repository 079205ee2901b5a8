//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Progress and results go to stdout and respect the quiet flag. Warnings
//! and errors go to stderr. Diagnostics belong to `tracing`, not here.

use std::fmt::Display;

use crate::core::types::SyncStatus;
use crate::engine::{SyncAction, SyncOutcome};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a hint following an error (always shown).
pub fn hint(message: impl Display) {
    eprintln!("hint: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// One-line summary of a sync.
///
/// ```
/// use gitferry::core::types::SyncStatus;
/// use gitferry::engine::{SyncAction, SyncOutcome};
/// use gitferry::ui::output::format_sync_outcome;
///
/// let outcome = SyncOutcome { status: SyncStatus::NeedPull, action: SyncAction::Rebased, pushed: false };
/// assert_eq!(format_sync_outcome("dev", &outcome), "dev: behind, rebased");
/// ```
pub fn format_sync_outcome(branch: &str, outcome: &SyncOutcome) -> String {
    let status = match outcome.status {
        SyncStatus::UpToDate => "up to date",
        SyncStatus::NeedPull => "behind",
        SyncStatus::NeedPush => "ahead",
        SyncStatus::Diverged => "diverged",
    };
    let action = match outcome.action {
        SyncAction::Nothing => None,
        SyncAction::Reset => Some("reset to remote"),
        SyncAction::Rebased => Some("rebased"),
        SyncAction::Merged => Some("merged"),
        SyncAction::PushOnly => None,
    };

    let mut parts = vec![status];
    parts.extend(action);
    if outcome.pushed {
        parts.push("pushed");
    }
    format!("{}: {}", branch, parts.join(", "))
}
