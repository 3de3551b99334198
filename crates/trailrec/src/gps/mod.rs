//! GPS logging.
//!
//! Reports stream in from gpsd, pass a two-stage filter (fix class, then field
//! completeness) and are handed to a [`RecordWriter`]: the daily store, or a
//! debug printer when debug mode is on.
//!
//! # Example
//!
//! ```
//! use trailrec::gps::{filter_report, FilterResult, PositionReport};
//!
//! let report = PositionReport::from_json(
//!     r#"{"class":"TPV","lat":1.0,"lon":2.0,"alt":3.0,"climb":0.1,"speed":5.0,"time":"2021-01-01T00:00:00Z"}"#,
//! )
//! .unwrap();
//!
//! match filter_report(&report) {
//!     FilterResult::Accepted(record) => assert_eq!(record.speed, 5.0),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

pub mod device;
mod filter;
pub mod logger;
mod record;
mod report;
pub mod source;

pub use device::{wait_for_device, DeviceProbe, DeviceWait};
pub use filter::{filter_report, FilterResult};
pub use logger::{run_logger, DebugPrinter, LoggerStats, RecordWriter};
pub use record::GpsRecord;
pub use report::{PositionReport, TPV_CLASS};
pub use source::{GpsdConnection, GpsdSource, ReportSource};
