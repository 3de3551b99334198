//! Storage layer for trailrec.
//!
//! GPS records go to an `SQLite` store chosen per calendar day.

pub mod migrations;
pub mod schema;
mod selector;

pub use selector::{
    open_store_for, store_identifier, store_path, today, StoreMode, FIXED_STORE_NAME,
    STORE_SUFFIX,
};

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gps::GpsRecord;

/// `SQLite` store for GPS records.
///
/// The connection is released by [`GpsStore::close`]; closing an already
/// closed store does nothing, and any other operation on it fails with
/// [`Error::StoreClosed`].
#[derive(Debug)]
pub struct GpsStore {
    /// Path to the store file.
    path: PathBuf,
    /// Store connection, `None` once closed.
    conn: Option<Connection>,
}

impl GpsStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories if they don't exist and brings the
    /// schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::StoreOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Store opened at {}", path.display());
        Ok(Self {
            path,
            conn: Some(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory store cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StoreOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Some(conn),
        })
    }

    /// Get the path to the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the connection is still held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::StoreClosed)
    }

    /// Insert a record, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the insert fails.
    pub fn insert(&self, record: &GpsRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            schema::INSERT_GPS_RECORD,
            params![
                record.latitude,
                record.longitude,
                record.altitude,
                record.climb_speed,
                record.speed,
                format_timestamp(record.timestamp),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted GPS record with id {}", id);
        Ok(id)
    }

    /// Count records in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the query fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM gps_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get the most recently inserted records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the query fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<GpsRecord>> {
        let mut stmt = self.conn()?.prepare(&format!(
            "SELECT {} FROM gps_records ORDER BY id DESC LIMIT ?1",
            schema::RECORD_COLUMNS
        ))?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or a query fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let total_records = self.count()?;

        let (first, last): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM gps_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_records,
            first_fix: first.as_deref().and_then(parse_timestamp),
            last_fix: last.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Release the connection.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` refuses to close the connection.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, e)| Error::StoreQuery(e))?;
                info!("Store closed at {}", self.path.display());
            }
            None => debug!("Store at {} already closed", self.path.display()),
        }
        Ok(())
    }

    /// Convert a row to a `GpsRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<GpsRecord> {
        let timestamp_str: String = row.get(6)?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(GpsRecord {
            id: Some(row.get(0)?),
            latitude: row.get(1)?,
            longitude: row.get(2)?,
            altitude: row.get(3)?,
            climb_speed: row.get(4)?,
            speed: row.get(5)?,
            timestamp,
        })
    }
}

/// Fixed-width RFC 3339 so text order matches time order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Timestamp of the earliest fix.
    pub first_fix: Option<DateTime<Utc>>,
    /// Timestamp of the latest fix.
    pub last_fix: Option<DateTime<Utc>>,
    /// Size of the store file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn create_test_store() -> GpsStore {
        GpsStore::open_in_memory().expect("failed to create test store")
    }

    fn record_at(second: u32) -> GpsRecord {
        GpsRecord::new(
            1.0,
            2.0,
            3.0,
            0.1,
            5.0,
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, second).unwrap(),
        )
    }

    #[test]
    fn test_open_in_memory() {
        let store = GpsStore::open_in_memory();
        assert!(store.is_ok());
        assert!(store.unwrap().is_open());
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = create_test_store();
        let id = store.insert(&record_at(0)).unwrap();

        let records = store.recent(10).unwrap();
        assert_eq!(records.len(), 1);

        let mut expected = record_at(0);
        expected.id = Some(id);
        assert_eq!(records[0], expected);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = create_test_store();
        for second in 0..5 {
            store.insert(&record_at(second)).unwrap();
        }

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, record_at(4).timestamp);
        assert_eq!(recent[1].timestamp, record_at(3).timestamp);
    }

    #[test]
    fn test_timestamp_stored_as_rfc3339() {
        let store = create_test_store();
        store.insert(&record_at(0)).unwrap();

        let raw: String = store
            .conn()
            .unwrap()
            .query_row("SELECT timestamp FROM gps_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, "2021-01-01T00:00:00.000000000Z");
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&record_at(0)).unwrap();
        store.insert(&record_at(1)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_stats_empty() {
        let stats = create_test_store().stats().unwrap();

        assert_eq!(stats.total_records, 0);
        assert!(stats.first_fix.is_none());
        assert!(stats.last_fix.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let store = create_test_store();
        store.insert(&record_at(7)).unwrap();
        store.insert(&record_at(3)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.first_fix, Some(record_at(3).timestamp));
        assert_eq!(stats.last_fix, Some(record_at(7).timestamp));
    }

    #[test]
    fn test_stats_orders_fractional_seconds() {
        let store = create_test_store();
        let whole = record_at(0);
        let mut fractional = record_at(0);
        fractional.timestamp += chrono::Duration::milliseconds(500);

        store.insert(&whole).unwrap();
        store.insert(&fractional).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.first_fix, Some(whole.timestamp));
        assert_eq!(stats.last_fix, Some(fractional.timestamp));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut store = create_test_store();
        store.close().unwrap();
        assert!(!store.is_open());
        store.close().unwrap();
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut store = create_test_store();
        store.close().unwrap();

        assert!(matches!(store.insert(&record_at(0)), Err(Error::StoreClosed)));
        assert!(matches!(store.count(), Err(Error::StoreClosed)));
        assert!(matches!(store.recent(1), Err(Error::StoreClosed)));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gps").join("2021-03-04-gps_data");

        let store = GpsStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2021-03-04-gps_data");

        let mut store = GpsStore::open(&path).unwrap();
        store.insert(&record_at(0)).unwrap();
        store.close().unwrap();

        let store = GpsStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.stats().unwrap().db_size_bytes > 0);
    }
}
