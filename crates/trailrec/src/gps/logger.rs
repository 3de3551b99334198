//! The report ingest loop.

use std::io::Write;

use tracing::{debug, info, trace};

use super::filter::{filter_report, FilterResult};
use super::record::GpsRecord;
use super::report::PositionReport;
use super::source::ReportSource;
use crate::error::Result;
use crate::shutdown::ShutdownToken;
use crate::storage::GpsStore;

/// Destination for accepted records.
pub trait RecordWriter: Send {
    /// Persist (or otherwise emit) one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write_record(&mut self, record: &GpsRecord) -> Result<()>;

    /// Release the destination. Calling this more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing fails.
    fn close(&mut self) -> Result<()>;
}

impl RecordWriter for GpsStore {
    fn write_record(&mut self, record: &GpsRecord) -> Result<()> {
        self.insert(record).map(|_| ())
    }

    fn close(&mut self) -> Result<()> {
        GpsStore::close(self)
    }
}

/// Debug-mode writer: pretty-prints each record's fields instead of storing it.
#[derive(Debug)]
pub struct DebugPrinter<W> {
    out: W,
}

impl<W: Write + Send> DebugPrinter<W> {
    /// Print records to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl DebugPrinter<std::io::Stdout> {
    /// Print records to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> RecordWriter for DebugPrinter<W> {
    fn write_record(&mut self, record: &GpsRecord) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, record)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Reports received from the source.
    pub received: u64,
    /// Records handed to the writer.
    pub persisted: u64,
    /// Reports dropped for not being TPV.
    pub skipped_class: u64,
    /// TPV reports dropped for missing fields.
    pub skipped_incomplete: u64,
}

/// What the next loop iteration got.
enum Step {
    Shutdown,
    EndOfStream,
    Report(PositionReport),
}

/// Filter reports from `source` into `writer` until the stream ends or
/// `token` is cancelled.
///
/// The writer is closed on every exit path, including errors.
///
/// # Errors
///
/// Returns an error if the source fails or a record cannot be written.
pub async fn run_logger<S, W>(
    source: &mut S,
    writer: &mut W,
    token: &ShutdownToken,
) -> Result<LoggerStats>
where
    S: ReportSource + ?Sized,
    W: RecordWriter + ?Sized,
{
    let result = ingest(source, writer, token).await;
    let closed = writer.close();

    let stats = result?;
    closed?;
    info!(
        received = stats.received,
        persisted = stats.persisted,
        skipped_class = stats.skipped_class,
        skipped_incomplete = stats.skipped_incomplete,
        "GPS logger stopped"
    );
    Ok(stats)
}

async fn ingest<S, W>(source: &mut S, writer: &mut W, token: &ShutdownToken) -> Result<LoggerStats>
where
    S: ReportSource + ?Sized,
    W: RecordWriter + ?Sized,
{
    let mut stats = LoggerStats::default();

    loop {
        let step = tokio::select! {
            biased;
            () = token.cancelled() => Step::Shutdown,
            next = source.next_report() => match next? {
                Some(report) => Step::Report(report),
                None => Step::EndOfStream,
            },
        };

        let report = match step {
            Step::Shutdown => {
                info!("Shutdown requested, leaving GPS loop");
                break;
            }
            Step::EndOfStream => {
                info!("GPS report stream ended");
                break;
            }
            Step::Report(report) => report,
        };

        stats.received += 1;
        match filter_report(&report) {
            FilterResult::Accepted(record) => {
                writer.write_record(&record)?;
                stats.persisted += 1;
                trace!(timestamp = %record.timestamp, "Recorded fix");
            }
            FilterResult::NotFix { class } => {
                trace!(%class, "Ignoring non-TPV report");
                stats.skipped_class += 1;
            }
            FilterResult::Incomplete { field } => {
                debug!(field, "Dropping incomplete TPV report");
                stats.skipped_incomplete += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::Error;

    /// Replays queued items, then either ends or blocks forever.
    #[derive(Debug, Default)]
    struct ScriptedSource {
        items: VecDeque<Result<PositionReport>>,
        hang_at_end: bool,
    }

    impl ScriptedSource {
        fn new(reports: Vec<PositionReport>) -> Self {
            Self {
                items: reports.into_iter().map(Ok).collect(),
                hang_at_end: false,
            }
        }
    }

    #[async_trait]
    impl ReportSource for ScriptedSource {
        async fn next_report(&mut self) -> Result<Option<PositionReport>> {
            match self.items.pop_front() {
                Some(item) => item.map(Some),
                None if self.hang_at_end => {
                    std::future::pending::<()>().await;
                    Ok(None)
                }
                None => Ok(None),
            }
        }
    }

    /// Collects records and counts close calls.
    #[derive(Debug, Default)]
    struct MemoryWriter {
        records: Vec<GpsRecord>,
        closes: u32,
    }

    impl RecordWriter for MemoryWriter {
        fn write_record(&mut self, record: &GpsRecord) -> Result<()> {
            self.records.push(record.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    fn tpv() -> PositionReport {
        PositionReport {
            class: "TPV".to_string(),
            lat: Some(1.0),
            lon: Some(2.0),
            alt: Some(3.0),
            climb: Some(0.1),
            speed: Some(5.0),
            time: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_filters_and_persists() {
        let mut incomplete = tpv();
        incomplete.alt = None;
        let mut sky = tpv();
        sky.class = "SKY".to_string();

        let mut source = ScriptedSource::new(vec![tpv(), incomplete, sky, tpv()]);
        let mut writer = MemoryWriter::default();

        let stats = run_logger(&mut source, &mut writer, &ShutdownToken::new())
            .await
            .unwrap();

        assert_eq!(
            stats,
            LoggerStats {
                received: 4,
                persisted: 2,
                skipped_class: 1,
                skipped_incomplete: 1,
            }
        );
        assert_eq!(writer.records.len(), 2);
        assert_eq!(writer.closes, 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_blocked_loop() {
        let mut source = ScriptedSource {
            items: VecDeque::from([Ok(tpv())]),
            hang_at_end: true,
        };
        let mut writer = MemoryWriter::default();
        let token = ShutdownToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let stats = run_logger(&mut source, &mut writer, &token).await.unwrap();
        assert_eq!(stats.persisted, 1);
        assert_eq!(writer.closes, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reads_nothing() {
        let token = ShutdownToken::new();
        token.cancel();

        let mut source = ScriptedSource::new(vec![tpv()]);
        let mut writer = MemoryWriter::default();
        let stats = run_logger(&mut source, &mut writer, &token).await.unwrap();

        assert_eq!(stats.received, 0);
        assert_eq!(source.items.len(), 1);
        assert_eq!(writer.closes, 1);
    }

    #[tokio::test]
    async fn test_source_error_still_closes_writer() {
        let mut source = ScriptedSource {
            items: VecDeque::from([Ok(tpv()), Err(Error::gps_stream("connection reset"))]),
            hang_at_end: false,
        };
        let mut writer = MemoryWriter::default();

        let err = run_logger(&mut source, &mut writer, &ShutdownToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GpsStream(_)));
        assert_eq!(writer.records.len(), 1);
        assert_eq!(writer.closes, 1);
    }

    #[tokio::test]
    async fn test_persists_into_store() {
        let mut store = GpsStore::open_in_memory().unwrap();
        let mut source = ScriptedSource::new(vec![tpv(), tpv()]);

        run_logger(&mut source, &mut store, &ShutdownToken::new())
            .await
            .unwrap();

        assert!(!store.is_open());
        assert!(matches!(store.count(), Err(Error::StoreClosed)));
        // A second close during an overlapping shutdown is harmless
        assert!(RecordWriter::close(&mut store).is_ok());
    }

    #[tokio::test]
    async fn test_store_receives_exact_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2021-01-01-gps_data");
        let mut store = GpsStore::open(&path).unwrap();
        let mut source = ScriptedSource::new(vec![tpv()]);

        run_logger(&mut source, &mut store, &ShutdownToken::new())
            .await
            .unwrap();

        let reopened = GpsStore::open(&path).unwrap();
        let records = reopened.recent(10).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.latitude, 1.0);
        assert_eq!(record.longitude, 2.0);
        assert_eq!(record.altitude, 3.0);
        assert_eq!(record.climb_speed, 0.1);
        assert_eq!(record.speed, 5.0);
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_debug_printer_prints_fields() {
        let mut source = ScriptedSource::new(vec![tpv()]);
        let mut printer = DebugPrinter::new(Vec::new());

        let stats = run_logger(&mut source, &mut printer, &ShutdownToken::new())
            .await
            .unwrap();
        assert_eq!(stats.persisted, 1);

        let output = String::from_utf8(printer.out).unwrap();
        assert!(output.contains("\"latitude\": 1.0"));
        assert!(output.contains("\"climb_speed\": 0.1"));
        assert!(output.contains("\"timestamp\": \"2021-01-01T00:00:00Z\""));
        assert!(!output.contains("\"id\""));
    }
}
