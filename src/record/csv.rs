//! CSV persistence for link records.
//!
//! Records accumulate in memory for the whole run and are written in one
//! shot when the sweep ends or is cancelled. A sweep produces a few
//! thousand rows at most, and a single write avoids torn files when the
//! bench loses power mid-run. Write failures are logged, never fatal; the
//! sweep's summary still reaches the operator through the log.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::types::LinkRecord;

/// Buffers link records and writes them as CSV at shutdown.
pub struct CsvRecorder {
    path: PathBuf,
    records: Vec<LinkRecord>,
}

impl CsvRecorder {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collects records until the channel closes or cancellation fires,
    /// then persists everything. Returns the number of rows written.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<LinkRecord>,
        cancel: CancellationToken,
    ) -> usize {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe = rx.recv() => match maybe {
                    Some(record) => self.records.push(record),
                    None => break,
                }
            }
        }

        // The ingest loop may still be winding down; keep whatever it
        // managed to queue before the channel drops.
        while let Ok(record) = rx.try_recv() {
            self.records.push(record);
        }

        match self.save() {
            Ok(rows) => {
                info!(path = %self.path.display(), rows = rows, "Link records saved");
                rows
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to save link records: {}", e);
                0
            }
        }
    }

    /// Writes the header and every buffered row to `path`.
    pub fn save(&self) -> std::io::Result<usize> {
        let mut out = String::with_capacity(self.records.len() * 256 + 512);
        out.push_str(&LinkRecord::csv_header());
        out.push('\n');
        for record in &self.records {
            out.push_str(&record.csv_row());
            out.push('\n');
        }
        std::fs::write(&self.path, out)?;
        Ok(self.records.len())
    }
}
