//! Error types for trailrec.
//!
//! This module defines all error types used throughout the trailrec crate,
//! covering the GPS store, configuration, the camera and the GPS stream.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for trailrec operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    /// Failed to open or create the GPS store.
    #[error("failed to open store at {path}: {source}")]
    StoreOpen {
        /// Path to the store file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A store query failed.
    #[error("store query failed: {0}")]
    StoreQuery(#[from] rusqlite::Error),

    /// Failed to run store migrations.
    #[error("store migration failed: {message}")]
    StoreMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The store connection has already been released.
    #[error("store is closed")]
    StoreClosed,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Camera Errors ===
    /// The camera failed to start streaming.
    #[error("failed to start camera '{name}': {message}")]
    CameraStart {
        /// Name of the camera backend.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// The camera failed to stop streaming.
    #[error("failed to stop camera '{name}': {message}")]
    CameraStop {
        /// Name of the camera backend.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === GPS Errors ===
    /// Failed to connect to the GPS daemon.
    #[error("failed to connect to gpsd at {addr}: {source}")]
    GpsConnect {
        /// Address that was dialed.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The GPS report stream failed.
    #[error("GPS stream error: {0}")]
    GpsStream(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for trailrec operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new GPS stream error.
    #[must_use]
    pub fn gps_stream(message: impl Into<String>) -> Self {
        Self::GpsStream(message.into())
    }

    /// Create a camera start error.
    #[must_use]
    pub fn camera_start(name: &'static str, message: impl Into<String>) -> Self {
        Self::CameraStart {
            name,
            message: message.into(),
        }
    }

    /// Create a camera stop error.
    #[must_use]
    pub fn camera_stop(name: &'static str, message: impl Into<String>) -> Self {
        Self::CameraStop {
            name,
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}
