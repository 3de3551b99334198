//! `trailrec` - Unattended dashcam recorder and GPS logger
//!
//! This library provides the two long-running loops behind the `trailrec`
//! binary: a segment recorder that writes rotating, resumable H.264 files and
//! a GPS logger that filters gpsd position reports into a per-day store.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod gps;
pub mod logging;
pub mod recorder;
pub mod sequencer;
pub mod shutdown;
pub mod storage;

pub use camera::{Camera, ProcessCamera, Resolution};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use recorder::{Recorder, RecorderStats};
pub use sequencer::{FilenameSequencer, NamingScheme};
pub use shutdown::ShutdownToken;
pub use storage::{GpsStore, StoreMode, StoreStats};
