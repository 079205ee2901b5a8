//! core
//!
//! Core domain types, policy and configuration for Ferry.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RemoteRef, RefSpec, SyncStatus
//! - [`policy`] - Workflow policy validation (which merges are allowed)
//! - [`naming`] - Staging branch naming
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing in this layer touches the repository

pub mod config;
pub mod naming;
pub mod policy;
pub mod types;
