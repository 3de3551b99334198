//! The persisted GPS record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete fix, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsRecord {
    /// Row id (assigned by the store).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Latitude in degrees, positive north.
    pub latitude: f64,

    /// Longitude in degrees, positive east.
    pub longitude: f64,

    /// Altitude in meters.
    pub altitude: f64,

    /// Climb (positive) or sink (negative) rate in m/s.
    pub climb_speed: f64,

    /// Speed over ground in m/s.
    pub speed: f64,

    /// Time of the fix.
    pub timestamp: DateTime<Utc>,
}

impl GpsRecord {
    /// Create a record that has not been stored yet.
    #[must_use]
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        climb_speed: f64,
        speed: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            latitude,
            longitude,
            altitude,
            climb_speed,
            speed,
            timestamp,
        }
    }
}
