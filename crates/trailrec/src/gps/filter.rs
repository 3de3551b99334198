//! Report filtering.

use super::record::GpsRecord;
use super::report::PositionReport;

/// Outcome of filtering one report.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    /// The report is a complete fix.
    Accepted(GpsRecord),

    /// The report is not a Time-Position-Velocity report.
    NotFix {
        /// Class of the dropped report.
        class: String,
    },

    /// A TPV report lacking a required field.
    Incomplete {
        /// First missing field.
        field: &'static str,
    },
}

/// Turn a report into a record, or say why it was dropped.
///
/// Non-TPV reports are dropped whatever fields they carry. TPV reports must
/// carry latitude, longitude, altitude, climb, speed and time.
#[must_use]
pub fn filter_report(report: &PositionReport) -> FilterResult {
    if !report.is_tpv() {
        return FilterResult::NotFix {
            class: report.class.clone(),
        };
    }

    match complete_record(report) {
        Ok(record) => FilterResult::Accepted(record),
        Err(field) => FilterResult::Incomplete { field },
    }
}

fn complete_record(report: &PositionReport) -> Result<GpsRecord, &'static str> {
    Ok(GpsRecord::new(
        require(report.lat, "latitude")?,
        require(report.lon, "longitude")?,
        require(report.alt, "altitude")?,
        require(report.climb, "climb_speed")?,
        require(report.speed, "speed")?,
        require(report.time, "timestamp")?,
    ))
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, &'static str> {
    value.ok_or(field)
}
