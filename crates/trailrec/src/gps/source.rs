//! Sources of positioning reports.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::report::PositionReport;
use crate::error::{Error, Result};

/// Command asking gpsd to stream JSON reports.
pub const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// A blocking stream of positioning reports.
#[async_trait]
pub trait ReportSource: Send {
    /// Wait for the next report.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream fails.
    async fn next_report(&mut self) -> Result<Option<PositionReport>>;
}

/// A [`GpsdSource`] connected to gpsd over TCP.
pub type GpsdConnection = GpsdSource<BufReader<TcpStream>>;

/// Reports read from a gpsd watch stream (one JSON object per line).
#[derive(Debug)]
pub struct GpsdSource<R> {
    reader: R,
    line: String,
}

impl GpsdSource<BufReader<TcpStream>> {
    /// Connect to gpsd at `addr` and enable JSON watching.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the watch request fails.
    pub async fn connect(addr: &str) -> Result<Self> {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| Error::GpsConnect {
                addr: addr.to_string(),
                source,
            })?;

        stream
            .write_all(WATCH_COMMAND.as_bytes())
            .await
            .map_err(|e| Error::gps_stream(format!("failed to enable watch: {e}")))?;

        info!(addr, "Connected to gpsd");
        Ok(Self::from_reader(BufReader::new(stream)))
    }
}

impl<R: AsyncBufRead + Unpin + Send> GpsdSource<R> {
    /// Read reports from an already-open line stream.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ReportSource for GpsdSource<R> {
    async fn next_report(&mut self) -> Result<Option<PositionReport>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(|e| Error::gps_stream(e.to_string()))?;

            if read == 0 {
                debug!("gpsd stream closed");
                return Ok(None);
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            match PositionReport::from_json(line) {
                Ok(report) => return Ok(Some(report)),
                Err(e) => warn!(error = %e, "Skipping undecodable gpsd line"),
            }
        }
    }
}
