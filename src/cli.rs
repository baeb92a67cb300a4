// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stageline`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stageline",
    version,
    about = "Run a sequential task pipeline and announce stage completions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Stageline.toml` in the current working directory, or the
    /// built-in three-stage pipeline if that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGELINE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Treat the network as unreachable when checking stage preconditions.
    #[arg(long)]
    pub offline: bool,

    /// Deny the notification capability; only toasts are shown.
    #[arg(long)]
    pub deny_notifications: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
