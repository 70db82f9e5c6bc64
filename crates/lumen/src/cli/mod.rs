//! Subcommand implementations for the `lumen` binary.

pub mod config;
pub mod ops;
pub mod run;
