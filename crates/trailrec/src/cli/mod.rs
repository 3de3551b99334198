//! Command-line interface for trailrec.
//!
//! This module provides the CLI structure for the `trailrec` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, DumpCommand, GpsCommand, OutputFormat, RecordCommand};

/// trailrec - Dashcam recorder and GPS logger
///
/// Records rotating video segments from the camera module and logs GPS fixes
/// to a per-day store. Both daemons stop cleanly on SIGTERM or SIGINT.
#[derive(Debug, Parser)]
#[command(name = "trailrec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record rotating video segments until stopped
    Record(RecordCommand),

    /// Log GPS fixes until stopped
    Gps(GpsCommand),

    /// Print stored GPS records
    Dump(DumpCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
