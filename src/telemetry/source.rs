//! Snapshot source abstraction for telemetry ingestion.
//!
//! Provides a unified trait for receiving UE snapshots from different
//! sources: pre-loaded replay, stdin (JSON lines), and the live TCP stats
//! endpoint.

use anyhow::Result;
use async_trait::async_trait;

use super::client::{StatsClient, TelemetryError, TelemetryRequester};
use crate::types::UeSnapshot;

/// Events produced by a snapshot source.
pub enum SnapshotEvent {
    /// A snapshot was received.
    Snapshot(UeSnapshot),
    /// Source reached end of data (EOF for files/stdin, permanent
    /// disconnect for TCP).
    Eof,
}

/// Trait abstracting where UE snapshots come from.
///
/// Implementations handle parsing, reconnection, and pacing internally.
/// The ingest loop calls [`next_snapshot`] in a select! with cancellation.
#[async_trait]
pub trait SnapshotSource: Send + 'static {
    /// Receive the next snapshot from the source.
    ///
    /// Returns `SnapshotEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable errors (e.g. failed reconnection).
    async fn next_snapshot(&mut self) -> Result<SnapshotEvent>;

    /// Human-readable name for logging (e.g. "replay", "stdin", "stats-tcp").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source (pre-loaded snapshots)
// ============================================================================

/// Replays pre-loaded snapshots with optional inter-snapshot delay.
pub struct ReplaySource {
    snapshots: std::vec::IntoIter<UeSnapshot>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    #[must_use]
    pub fn new(snapshots: Vec<UeSnapshot>, delay_ms: u64) -> Self {
        Self {
            snapshots: snapshots.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }
}

#[async_trait]
impl SnapshotSource for ReplaySource {
    async fn next_snapshot(&mut self) -> Result<SnapshotEvent> {
        // No delay before the first snapshot so short replays start
        // producing samples immediately.
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.snapshots.next() {
            Some(s) => {
                self.yielded_first = true;
                Ok(SnapshotEvent::Snapshot(s))
            }
            None => Ok(SnapshotEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Stdin Source (JSON snapshots, one per line)
// ============================================================================

/// Reads JSON snapshots from stdin, one per line.
///
/// Pairs with any tool that can tee the stats endpoint:
/// `socat - TCP:bench:9001 | linksweep --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(4096),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSource for StdinSource {
    async fn next_snapshot(&mut self) -> Result<SnapshotEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SnapshotEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<UeSnapshot>(line) {
                Ok(snapshot) => return Ok(SnapshotEvent::Snapshot(snapshot)),
                Err(e) => {
                    tracing::warn!("[StdinSource] Failed to parse snapshot: {}", e);
                    // Skip malformed lines and keep reading
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// TCP Source (live stats endpoint)
// ============================================================================

/// Receives snapshots from the live stats endpoint.
///
/// Wraps [`StatsClient`] which handles reconnection and timeouts
/// internally.
pub struct TcpSource {
    client: StatsClient,
}

impl TcpSource {
    /// Connect to the stats endpoint and return a ready source.
    pub async fn connect(
        host: &str,
        port: u16,
        read_timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self> {
        let mut client = StatsClient::new(host, port)
            .with_read_timeout(read_timeout_secs)
            .with_connect_timeout(connect_timeout_secs);
        client.connect().await?;
        Ok(Self { client })
    }

    /// Shared write-half handle for the keep-alive poller and command sink.
    #[must_use]
    pub fn requester(&self) -> TelemetryRequester {
        self.client.requester()
    }
}

#[async_trait]
impl SnapshotSource for TcpSource {
    async fn next_snapshot(&mut self) -> Result<SnapshotEvent> {
        // StatsClient::read_snapshot() reconnects internally; an error here
        // means reconnection has already been exhausted.
        match self.client.read_snapshot().await {
            Ok(snapshot) => Ok(SnapshotEvent::Snapshot(snapshot)),
            Err(TelemetryError::ConnectionClosed) => Ok(SnapshotEvent::Eof),
            Err(e) => Err(anyhow::anyhow!("stats endpoint error: {e}")),
        }
    }

    fn source_name(&self) -> &str {
        "stats-tcp"
    }
}
