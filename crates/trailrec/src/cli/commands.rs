//! CLI command definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

/// `record` command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Directory to write segments into
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Embed the start time in segment filenames
    #[arg(short, long)]
    pub timestamped: bool,

    /// Number of segments before numbering wraps
    #[arg(short, long, value_name = "N")]
    pub max_segments: Option<u32>,
}

/// `gps` command arguments.
#[derive(Debug, Args)]
pub struct GpsCommand {
    /// Print records instead of storing them
    #[arg(short = 'D', long)]
    pub debug_mode: bool,

    /// Directory holding the GPS stores
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// `dump` command arguments.
#[derive(Debug, Args)]
pub struct DumpCommand {
    /// Day to read (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Maximum number of records
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Directory holding the GPS stores
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        file: Option<PathBuf>,
    },
}

/// Output format for record listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    Table,
    /// One JSON object per record
    Json,
}
