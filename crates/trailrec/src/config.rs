//! Configuration management for trailrec.
//!
//! Configuration is loaded with figment from defaults, a TOML file and
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::camera::Resolution;
use crate::error::{Error, Result};
use crate::storage::StoreMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "trailrec";

/// Environment variable whose presence switches the GPS logger to debug mode.
pub const DEBUG_MODE_ENV: &str = "GPS_DEBUG_MODE";

/// Largest segment count that still fits the four-digit filename field.
const MAX_SEGMENTS_LIMIT: u32 = 9999;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TRAILREC_`, nested with `__`)
/// 2. TOML config file at `~/.config/trailrec/config.toml`
/// 3. Default values
///
/// The presence of `GPS_DEBUG_MODE` always turns GPS debug mode on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video recorder configuration.
    pub recorder: RecorderConfig,
    /// GPS logger configuration.
    pub gps: GpsConfig,
}

/// Video recorder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory segments are written to.
    /// Defaults to `~/.local/share/trailrec/video`
    pub output_dir: Option<PathBuf>,
    /// Number of distinct segment files before the sequence wraps to 1.
    pub max_segments: u32,
    /// Length of a single segment in seconds.
    pub segment_seconds: u64,
    /// Capture resolution (`720p`, `1080p`, `480p` or `WxH`).
    pub resolution: String,
    /// Capture frame rate.
    pub framerate: u32,
    /// Embed the local start time in segment filenames.
    pub timestamped_names: bool,
    /// Camera program that writes an H.264 stream to stdout.
    pub camera_command: String,
}

/// GPS logger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Directory holding the GPS stores.
    /// Defaults to `~/.local/share/trailrec/gps`
    pub data_dir: Option<PathBuf>,
    /// One store per day or a single fixed store.
    pub store_mode: StoreMode,
    /// Print records instead of persisting them.
    pub debug_mode: bool,
    /// Host running gpsd.
    pub gpsd_host: String,
    /// Port gpsd listens on.
    pub gpsd_port: u16,
    /// Seconds between checks for the GPS receiver.
    pub device_poll_seconds: u64,
    /// Number of presence checks before giving up. 0 means never give up.
    pub device_max_attempts: u32,
    /// USB vendor id of the receiver (hex).
    pub usb_vendor_id: String,
    /// USB product id of the receiver (hex). Any product matches when unset.
    pub usb_product_id: Option<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_segments: 2000, // ~5.5 hours at 10s per segment
            segment_seconds: 10,
            resolution: "720p".to_string(),
            framerate: 30,
            timestamped_names: false,
            camera_command: "rpicam-vid".to_string(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            store_mode: StoreMode::Daily,
            debug_mode: false,
            gpsd_host: "127.0.0.1".to_string(),
            gpsd_port: 2947,
            device_poll_seconds: 30,
            device_max_attempts: 0,
            usb_vendor_id: "1546".to_string(), // u-blox
            usb_product_id: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TRAILREC_").split("__"));

        let mut config: Config = figment.extract()?;
        config.apply_debug_env(std::env::var_os(DEBUG_MODE_ENV).is_some());
        config.validate()?;
        Ok(config)
    }

    /// Force debug mode on when the debug environment flag is present.
    pub fn apply_debug_env(&mut self, present: bool) {
        if present {
            self.gps.debug_mode = true;
        }
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let recorder = &self.recorder;
        if recorder.max_segments == 0 || recorder.max_segments > MAX_SEGMENTS_LIMIT {
            return Err(Error::config_validation(format!(
                "max_segments must be between 1 and {MAX_SEGMENTS_LIMIT}, got {}",
                recorder.max_segments
            )));
        }

        if recorder.segment_seconds == 0 {
            return Err(Error::config_validation(
                "segment_seconds must be greater than 0",
            ));
        }

        if recorder.framerate == 0 {
            return Err(Error::config_validation("framerate must be greater than 0"));
        }

        recorder.resolution.parse::<Resolution>()?;

        if recorder.camera_command.trim().is_empty() {
            return Err(Error::config_validation("camera_command must not be empty"));
        }

        let gps = &self.gps;
        if gps.device_poll_seconds == 0 {
            return Err(Error::config_validation(
                "device_poll_seconds must be greater than 0",
            ));
        }

        if gps.gpsd_port == 0 {
            return Err(Error::config_validation("gpsd_port must be greater than 0"));
        }

        validate_usb_id("usb_vendor_id", &gps.usb_vendor_id)?;
        if let Some(product) = &gps.usb_product_id {
            validate_usb_id("usb_product_id", product)?;
        }

        Ok(())
    }

    /// Get the segment output directory, resolving defaults if not set.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.recorder
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("video"))
    }

    /// Get the GPS store directory, resolving defaults if not set.
    #[must_use]
    pub fn gps_data_dir(&self) -> PathBuf {
        self.gps
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("gps"))
    }

    /// Get the configured capture resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolution string cannot be parsed.
    pub fn resolution(&self) -> Result<Resolution> {
        self.recorder.resolution.parse()
    }

    /// Get the segment length as a Duration.
    #[must_use]
    pub fn segment_length(&self) -> Duration {
        Duration::from_secs(self.recorder.segment_seconds)
    }

    /// Get the device poll interval as a Duration.
    #[must_use]
    pub fn device_poll_interval(&self) -> Duration {
        Duration::from_secs(self.gps.device_poll_seconds)
    }

    /// Get the device attempt bound, `None` when unbounded.
    #[must_use]
    pub fn device_max_attempts(&self) -> Option<u32> {
        match self.gps.device_max_attempts {
            0 => None,
            n => Some(n),
        }
    }

    /// Get the gpsd address as `host:port`.
    #[must_use]
    pub fn gpsd_addr(&self) -> String {
        format!("{}:{}", self.gps.gpsd_host, self.gps.gpsd_port)
    }
}

/// Check that a USB id is four hex digits.
fn validate_usb_id(name: &str, value: &str) -> Result<()> {
    if value.len() == 4 && u16::from_str_radix(value, 16).is_ok() {
        Ok(())
    } else {
        Err(Error::config_validation(format!(
            "{name} must be four hex digits, got '{value}'"
        )))
    }
}
