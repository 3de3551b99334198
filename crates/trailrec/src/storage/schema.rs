//! `SQLite` schema for GPS stores.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the GPS record table.
///
/// Every value column is nullable; `timestamp` holds RFC 3339 UTC text.
pub const CREATE_GPS_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS gps_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL,
    longitude REAL,
    altitude REAL,
    climb_speed REAL,
    speed REAL,
    timestamp TEXT
)
";

/// SQL statement inserting one record.
pub const INSERT_GPS_RECORD: &str = r"
INSERT INTO gps_records (latitude, longitude, altitude, climb_speed, speed, timestamp)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
";

/// Columns selected when reading records back, in `GpsRecord` field order.
pub const RECORD_COLUMNS: &str = "id, latitude, longitude, altitude, climb_speed, speed, timestamp";
