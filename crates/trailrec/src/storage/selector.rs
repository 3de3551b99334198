//! Choosing which store receives the day's records.
//!
//! The store is picked once at startup; a run that crosses midnight keeps
//! writing to the store it opened.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::GpsStore;
use crate::error::Result;

/// Suffix of per-day store identifiers.
pub const STORE_SUFFIX: &str = "gps_data";

/// File name used in [`StoreMode::Fixed`].
pub const FIXED_STORE_NAME: &str = "gps_data.sqlite";

/// How stores are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// One store per calendar day, named `YYYY-MM-DD-gps_data`.
    #[default]
    Daily,
    /// A single store named `gps_data.sqlite`.
    Fixed,
}

impl StoreMode {
    /// The store file name for `date` under this mode.
    #[must_use]
    pub fn file_name(self, date: NaiveDate) -> String {
        match self {
            Self::Daily => store_identifier(date),
            Self::Fixed => FIXED_STORE_NAME.to_string(),
        }
    }
}

/// Identifier of the daily store for `date`.
#[must_use]
pub fn store_identifier(date: NaiveDate) -> String {
    format!("{}-{STORE_SUFFIX}", date.format("%Y-%m-%d"))
}

/// Path of the store for `date` in `dir`.
#[must_use]
pub fn store_path(dir: &Path, mode: StoreMode, date: NaiveDate) -> PathBuf {
    dir.join(mode.file_name(date))
}

/// Today's calendar date on this machine.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Open (creating if needed) the store for `date` and ensure its schema.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or migrated.
pub fn open_store_for(dir: &Path, mode: StoreMode, date: NaiveDate) -> Result<GpsStore> {
    let path = store_path(dir, mode, date);
    info!(path = %path.display(), ?mode, "Selected GPS store");
    GpsStore::open(path)
}
