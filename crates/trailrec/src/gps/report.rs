//! Positioning reports as delivered by gpsd.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Class of a Time-Position-Velocity report.
pub const TPV_CLASS: &str = "TPV";

/// One JSON object from the gpsd watch stream.
///
/// Every positional field is optional: gpsd omits what the receiver has not
/// resolved yet, and non-TPV classes carry none of them. Unknown keys are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    /// Report class (`TPV`, `SKY`, `VERSION`, ...).
    #[serde(default)]
    pub class: String,

    /// Latitude in degrees, positive north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    /// Longitude in degrees, positive east.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    /// Altitude in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,

    /// Climb (positive) or sink (negative) rate in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climb: Option<f64>,

    /// Speed over ground in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Time of the fix, UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl PositionReport {
    /// Decode a single gpsd JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid report object.
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Check if this is a Time-Position-Velocity report.
    #[must_use]
    pub fn is_tpv(&self) -> bool {
        self.class == TPV_CLASS
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_decode_full_tpv() {
        let report = PositionReport::from_json(
            r#"{"class":"TPV","device":"/dev/ttyACM0","mode":3,"time":"2021-01-01T00:00:00.000Z",
                "lat":1.0,"lon":2.0,"alt":3.0,"climb":0.1,"speed":5.0,"track":90.0}"#,
        )
        .unwrap();

        assert!(report.is_tpv());
        assert_eq!(report.lat, Some(1.0));
        assert_eq!(report.lon, Some(2.0));
        assert_eq!(report.alt, Some(3.0));
        assert_eq!(report.climb, Some(0.1));
        assert_eq!(report.speed, Some(5.0));
        assert_eq!(
            report.time,
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_decode_partial_tpv() {
        let report =
            PositionReport::from_json(r#"{"class":"TPV","mode":1,"time":"2021-01-01T00:00:00Z"}"#)
                .unwrap();

        assert!(report.is_tpv());
        assert!(report.lat.is_none());
        assert!(report.time.is_some());
    }

    #[test]
    fn test_decode_other_class() {
        let report =
            PositionReport::from_json(r#"{"class":"SKY","satellites":[{"PRN":1}]}"#).unwrap();

        assert!(!report.is_tpv());
        assert_eq!(report.class, "SKY");
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(PositionReport::from_json("$GPGGA,123519,4807.038,N").is_err());
    }
}
