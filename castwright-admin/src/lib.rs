//! # Castwright Admin
//!
//! Operational tooling for the Castwright database: configuration loading
//! and the subcommands of the `castwright-admin` binary.
//!
//! ## Modules
//!
//! - `config`: Environment-based configuration
//! - `command`: Command line definition (clap)

pub mod command;
pub mod config;
