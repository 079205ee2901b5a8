//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing text goes through this module so `--quiet` is honored
//! in one place. There are no interactive prompts: every decision is made
//! by flags or configuration.

pub mod output;
