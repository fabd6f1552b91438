use crate::core::chords::{build_uri, redacted};
use crate::core::matcher::match_reading;
use crate::domain::model::{ChordsRecord, RtlReading};
use crate::domain::ports::{ConfigProvider, Submitter};
use crate::utils::error::Result;
use chrono::Utc;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest rtl_433 line accepted; anything longer is skipped as malformed.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    pub lines: u64,
    pub malformed: u64,
    pub readings: u64,
    pub submitted: u64,
}

impl AddAssign for ForwardStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.malformed += other.malformed;
        self.readings += other.readings;
        self.submitted += other.submitted;
    }
}

/// Reads rtl_433 JSON lines and hands every matching value to a [`Submitter`].
pub struct Forwarder<C: ConfigProvider, S: Submitter> {
    config: Arc<C>,
    submitter: Arc<S>,
}

impl<C: ConfigProvider, S: Submitter> Clone for Forwarder<C, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            submitter: self.submitter.clone(),
        }
    }
}

impl<C: ConfigProvider, S: Submitter> Forwarder<C, S> {
    pub fn new(config: Arc<C>, submitter: Arc<S>) -> Self {
        Self { config, submitter }
    }

    pub fn submitter(&self) -> &Arc<S> {
        &self.submitter
    }

    /// Runs until the stream ends. Only read errors are returned; bad lines are logged.
    pub async fn forward_from_stream<R: AsyncBufRead + Unpin>(&self, mut reader: R) -> Result<ForwardStats> {
        let mut stats = ForwardStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut buf)
                .await?;
            if read == 0 {
                break;
            }
            if buf.len() >= MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
                let head = buf.len();
                let skipped = head + Self::skip_rest_of_line(&mut reader, &mut buf).await?;
                stats.lines += 1;
                stats.malformed += 1;
                tracing::error!("RTL line longer than {} bytes ({} bytes), skipping", MAX_LINE_BYTES, skipped);
                continue;
            }
            let line = String::from_utf8_lossy(&buf);
            self.handle_line(&line, &mut stats);
        }

        tracing::debug!("Stream finished: {:?}", stats);
        Ok(stats)
    }

    /// Consumes input up to and including the next newline, one bounded chunk at a time.
    async fn skip_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
        let mut skipped = 0;
        loop {
            buf.clear();
            let read = (&mut *reader)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', buf)
                .await?;
            skipped += read;
            if read == 0 || buf.last() == Some(&b'\n') {
                return Ok(skipped);
            }
        }
    }

    pub fn handle_line(&self, line: &str, stats: &mut ForwardStats) {
        stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        tracing::info!("RTL line is: {}", line);

        let data: serde_json::Value = match serde_json::from_str(line) {
            Ok(data) => data,
            Err(e) => {
                stats.malformed += 1;
                tracing::error!("Failed to parse RTL line: {}", e);
                return;
            }
        };
        let serde_json::Value::Object(map) = data else {
            stats.malformed += 1;
            tracing::error!("RTL line is not a JSON object: {}", line);
            return;
        };
        stats.readings += 1;

        let reading = RtlReading::new(map);
        for measurement in match_reading(self.config.as_ref(), &reading, Utc::now()) {
            let record = ChordsRecord::from_measurement(self.config.as_ref(), &measurement);
            match build_uri(self.config.chords_host(), &record) {
                Ok(uri) => {
                    tracing::info!("Submitting: {}", redacted(&uri));
                    self.submitter.submit(uri);
                    stats.submitted += 1;
                }
                Err(e) => tracing::error!("Failed to build CHORDS URI: {}", e),
            }
        }
    }
}
