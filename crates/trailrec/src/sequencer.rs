//! Rotating segment filenames.
//!
//! Segments are named `NNNN.h264` (or `NNNN_YYYY-MM-DD_HH-MM-SS.h264`) where
//! `NNNN` cycles through `1..=max`. After a restart the sequence resumes after
//! the most recently written segment, so the newest recording is never
//! overwritten.

use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use regex::Regex;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::shutdown::ShutdownToken;

/// Extension of every segment file.
pub const SEGMENT_EXTENSION: &str = "h264";

/// Default number of segments before the sequence wraps.
pub const DEFAULT_MAX_SEGMENTS: u32 = 2000;

/// Timestamp layout embedded in timestamped segment names.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Compiled pattern matching both segment spellings.
///
/// # Panics
///
/// Panics if the built-in pattern is invalid.
fn segment_name_regex() -> &'static Regex {
    static SEGMENT_NAME: OnceLock<Regex> = OnceLock::new();
    SEGMENT_NAME.get_or_init(|| {
        Regex::new(r"^(\d{4})(?:_\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})?\.h264$")
            .expect("Invalid segment name pattern")
    })
}

/// How segment filenames are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingScheme {
    /// `NNNN.h264`
    #[default]
    Plain,
    /// `NNNN_YYYY-MM-DD_HH-MM-SS.h264`, local time at creation.
    Timestamped,
}

impl NamingScheme {
    /// Build a segment filename for `number`.
    #[must_use]
    pub fn file_name(self, number: u32, now: DateTime<Local>) -> String {
        match self {
            Self::Plain => format!("{number:04}.{SEGMENT_EXTENSION}"),
            Self::Timestamped => format!(
                "{number:04}_{}.{SEGMENT_EXTENSION}",
                now.format(TIMESTAMP_FORMAT)
            ),
        }
    }
}

/// Extract the sequence number from a segment filename.
///
/// Returns `None` for anything that is not a segment file.
#[must_use]
pub fn parse_sequence_number(file_name: &str) -> Option<u32> {
    segment_name_regex()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The number that follows `current` in a `1..=max` cycle.
#[must_use]
pub fn next_after(current: u32, max: u32) -> u32 {
    if current >= max {
        1
    } else {
        current + 1
    }
}

/// Work out where the sequence resumes in `dir`.
///
/// The newest segment is chosen by modification time, not by name, so a
/// sequence that already wrapped resumes after the fresh low numbers. Files
/// sharing the newest timestamp are ordered by sequence number.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn resume_number(dir: &Path, max: u32) -> Result<u32> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Output directory {} does not exist yet", dir.display());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(SystemTime, u32)> = None;
    for entry in entries {
        let entry = entry?;
        let Some(number) = entry.file_name().to_str().and_then(parse_sequence_number) else {
            continue;
        };

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let candidate = (metadata.modified()?, number);
        trace!(number, "Found existing segment");
        if newest.map_or(true, |best| candidate > best) {
            newest = Some(candidate);
        }
    }

    Ok(match newest {
        None => 1,
        Some((_, last)) => {
            let next = next_after(last, max);
            info!(last, next, "Resuming segment sequence");
            next
        }
    })
}

/// An endless, restart-aware stream of segment paths.
///
/// The sequence wraps after `max` and only ends once the shutdown token is
/// cancelled; the token is checked before every emission.
#[derive(Debug)]
pub struct FilenameSequencer {
    dir: PathBuf,
    max: u32,
    next: u32,
    naming: NamingScheme,
    token: ShutdownToken,
    finished: bool,
}

impl FilenameSequencer {
    /// Create a sequencer that resumes after the newest segment in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be scanned.
    pub fn resume(
        dir: impl Into<PathBuf>,
        max: u32,
        naming: NamingScheme,
        token: ShutdownToken,
    ) -> Result<Self> {
        let dir = dir.into();
        let start = resume_number(&dir, max)?;
        Ok(Self::starting_at(dir, max, start, naming, token))
    }

    /// Create a sequencer that starts at `start`.
    ///
    /// A start outside `1..=max` begins at 1.
    #[must_use]
    pub fn starting_at(
        dir: impl Into<PathBuf>,
        max: u32,
        start: u32,
        naming: NamingScheme,
        token: ShutdownToken,
    ) -> Self {
        let max = max.max(1);
        let next = if (1..=max).contains(&start) { start } else { 1 };
        Self {
            dir: dir.into(),
            max,
            next,
            naming,
            token,
            finished: false,
        }
    }

    /// The sequence number the next call to `next()` will use.
    #[must_use]
    pub fn peek_number(&self) -> u32 {
        self.next
    }
}

impl Iterator for FilenameSequencer {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.finished || self.token.is_cancelled() {
            if !self.finished {
                debug!("Shutdown requested, ending segment sequence");
            }
            self.finished = true;
            return None;
        }

        let number = self.next;
        self.next = next_after(number, self.max);
        Some(self.dir.join(self.naming.file_name(number, Local::now())))
    }
}

impl FusedIterator for FilenameSequencer {}
