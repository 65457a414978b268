//! Command-line interface definitions
//!
//! Argument parsing is done with `clap` derive; the binary in `main.rs`
//! dispatches on [`Action`].

/// Subcommands and their options
pub mod commands;

pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, MineOptions};
