//! Diagnostics for the recorder and GPS daemons.
//!
//! Both loops report through `tracing`. Events go to stderr: in GPS debug
//! mode stdout carries the printed records, and under systemd stderr lands in
//! the journal either way.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the daemons are, picked with `-q` / `-v` / `-vv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Segment and store lifecycle (info and above).
    #[default]
    Normal,
    /// Per-segment and per-report decisions (debug and above).
    Verbose,
    /// Every scanned file and accepted fix (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Install the stderr subscriber.
///
/// Only `trailrec` targets are enabled at the chosen level; set `RUST_LOG`
/// (for example `trailrec::gps=trace,rusqlite=debug`) to override. Calling this
/// again after a subscriber is installed does nothing.
///
/// # Examples
///
/// ```no_run
/// use trailrec::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("trailrec={}", verbosity.to_level_filter());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Route warnings into the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
