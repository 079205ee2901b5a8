//! Ferry - synchronize, merge and patch Git branches across remotes
//!
//! Ferry drives a Git working tree through multi-step sequences (fetch,
//! compare, checkout, rebase or merge, squash, push) while keeping a few
//! promises: no remote branch is ever deleted by accident, no merge crosses
//! a version boundary the workflow policy forbids, and a failed step never
//! leaves the user mid-rebase or parked on a temporary branch.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Single-use sync, merge, patch and rebase operations
//! - [`core`] - Domain types, workflow policy, naming and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. An operation can be performed at most once, and only a performed
//!    operation can push
//! 2. A push refspec never has an empty local side
//! 3. A failed rebase is always aborted before its error is returned
//! 4. The branch checked out at the start is restored on every exit path

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
