//! Segment capture loop.
//!
//! For every path the sequencer yields, one file is created, filled by the
//! camera for a fixed duration, and synced to disk before the next segment
//! starts. Only one segment file is ever open at a time.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::camera::Camera;
use crate::error::{Error, Result};

/// Default length of one segment.
pub const DEFAULT_SEGMENT_LENGTH: Duration = Duration::from_secs(10);

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Number of segments written and synced.
    pub segments: u64,
}

/// Drives a [`Camera`] through a sequence of segment files.
#[derive(Debug)]
pub struct Recorder<C> {
    camera: C,
    segment_length: Duration,
}

impl<C: Camera> Recorder<C> {
    /// Create a recorder writing segments of `segment_length`.
    #[must_use]
    pub fn new(camera: C, segment_length: Duration) -> Self {
        Self {
            camera,
            segment_length,
        }
    }

    /// Record one segment per path until `segments` is exhausted.
    ///
    /// Capture and file system failures are not retried.
    ///
    /// # Errors
    ///
    /// Returns the first camera or I/O error encountered.
    pub async fn run<I>(&mut self, segments: I) -> Result<RecorderStats>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut stats = RecorderStats::default();

        for path in segments {
            self.record_segment(path.as_ref()).await?;
            stats.segments += 1;
        }

        info!(segments = stats.segments, "Stopped recording");
        Ok(stats)
    }

    async fn record_segment(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let file = File::create(path)?;
        self.camera.start_recording(file.try_clone()?).await?;
        debug!(path = %path.display(), "Recording segment");

        tokio::time::sleep(self.segment_length).await;

        self.camera.stop_recording().await?;
        file.sync_all()?;
        drop(file);

        info!(path = %path.display(), "Segment written");
        Ok(())
    }
}
