//! Camera abstraction for the segment recorder.
//!
//! The recorder only needs "start streaming into this file" and "stop". The
//! default backend runs a camera program (`rpicam-vid` on Raspberry Pi OS)
//! with its H.264 output redirected into the segment file. Stopping sends
//! SIGINT so the program flushes its last frames, and only kills it if it
//! does not exit in time.

use std::fmt;
use std::fs::File;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Capture resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
}

impl Resolution {
    /// 1280x720.
    pub const HD: Self = Self::new(1280, 720);

    /// Create a resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::config_validation(format!("invalid resolution: '{s}'"));

        match s.trim().to_ascii_lowercase().as_str() {
            "480p" => Ok(Self::new(640, 480)),
            "720p" => Ok(Self::HD),
            "1080p" => Ok(Self::new(1920, 1080)),
            other => {
                let (w, h) = other.split_once('x').ok_or_else(invalid)?;
                let width: u32 = w.parse().map_err(|_| invalid())?;
                let height: u32 = h.parse().map_err(|_| invalid())?;
                if width == 0 || height == 0 {
                    return Err(invalid());
                }
                Ok(Self::new(width, height))
            }
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A camera that can stream encoded video into a file.
#[async_trait]
pub trait Camera: Send {
    /// The name of this camera backend (for logging/errors).
    fn name(&self) -> &'static str;

    /// Begin streaming into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if streaming cannot start or is already running.
    async fn start_recording(&mut self, sink: File) -> Result<()>;

    /// Stop streaming and release the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera failed while streaming or is not running.
    async fn stop_recording(&mut self) -> Result<()>;

    /// Check if the camera is currently streaming.
    fn is_recording(&self) -> bool;
}

/// How long the capture program gets to exit after SIGINT.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Camera backed by an external capture program writing to stdout.
#[derive(Debug)]
pub struct ProcessCamera {
    program: String,
    args: Vec<String>,
    stop_timeout: Duration,
    child: Option<Child>,
}

impl ProcessCamera {
    /// Backend name used in errors.
    const NAME: &'static str = "process";

    /// Create a camera running `program` with `rpicam-vid` style arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, resolution: Resolution, framerate: u32) -> Self {
        let args = vec![
            "-t".to_string(),
            "0".to_string(),
            "-n".to_string(),
            "--codec".to_string(),
            "h264".to_string(),
            "--flush".to_string(),
            "--width".to_string(),
            resolution.width.to_string(),
            "--height".to_string(),
            resolution.height.to_string(),
            "--framerate".to_string(),
            framerate.to_string(),
            "-o".to_string(),
            "-".to_string(),
        ];
        Self::with_args(program, args)
    }

    /// Create a camera running `program` with exactly `args`.
    #[must_use]
    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            child: None,
        }
    }
}

#[async_trait]
impl Camera for ProcessCamera {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn start_recording(&mut self, sink: File) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::camera_start(Self::NAME, "already recording"));
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::camera_start(Self::NAME, format!("{}: {e}", self.program)))?;

        debug!(program = %self.program, pid = child.id(), "Camera process started");
        self.child = Some(child);
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Err(Error::camera_stop(Self::NAME, "not recording"));
        };

        if let Some(status) = child.try_wait()? {
            warn!(%status, "Camera process exited while recording");
            return Err(Error::camera_stop(
                Self::NAME,
                format!("{} exited early with {status}", self.program),
            ));
        }

        if interrupt(&child) {
            match tokio::time::timeout(self.stop_timeout, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    debug!(%status, "Camera process stopped");
                    return Ok(());
                }
                Err(_) => warn!(
                    program = %self.program,
                    timeout_secs = self.stop_timeout.as_secs_f64(),
                    "Camera process ignored interrupt, killing it"
                ),
            }
        }

        child
            .start_kill()
            .map_err(|e| Error::camera_stop(Self::NAME, e.to_string()))?;
        let status = child.wait().await?;
        debug!(%status, "Camera process killed");
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.child.is_some()
    }
}

/// Send SIGINT to the capture program. Returns `false` if it was not sent.
#[cfg(unix)]
fn interrupt(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };

    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) => true,
        Err(e) => {
            warn!(pid, error = %e, "Failed to interrupt camera process");
            false
        }
    }
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> bool {
    false
}
