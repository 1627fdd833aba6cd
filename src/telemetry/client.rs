//! Stats endpoint TCP client
//!
//! Newline-delimited JSON over TCP against the RAN stack's stats port. The
//! read half belongs to the ingest loop; the write half is shared through a
//! [`TelemetryRequester`] so the keep-alive poller and the command sink can
//! send on the same connection. Reconnection with exponential backoff and
//! per-read timeouts keep an unattended bench run alive across stack
//! restarts.

use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::defaults;
use crate::types::UeSnapshot;

/// Telemetry transport errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout waiting for telemetry")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,
}

/// Maximum reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial reconnection delay (doubles each attempt).
const INITIAL_RECONNECT_DELAY_SECS: u64 = 2;

/// Maximum reconnection delay cap (seconds).
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Identifier echoed back by the endpoint in replies to our requests.
pub(crate) const MESSAGE_ID: &str = "linksweep";

type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// Cloneable handle to the connection's write half.
///
/// Writes are fire-and-forget from the caller's perspective: a send on a
/// disconnected client returns [`TelemetryError::NotConnected`] and the
/// caller logs and moves on.
#[derive(Clone)]
pub struct TelemetryRequester {
    writer: SharedWriter,
}

impl TelemetryRequester {
    /// Send one `ue_get` stats request.
    pub async fn request_stats(&self) -> Result<(), TelemetryError> {
        let request = serde_json::json!({
            "stats": true,
            "message": "ue_get",
            "message_id": MESSAGE_ID,
        });
        self.send_json(&request).await
    }

    /// Send an arbitrary JSON message, newline-terminated.
    pub async fn send_json(&self, value: &serde_json::Value) -> Result<(), TelemetryError> {
        let mut line = value.to_string();
        line.push('\n');

        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(TelemetryError::NotConnected);
        };
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TelemetryError::ConnectionFailed(e.to_string()))
    }
}

/// Stats endpoint client with reconnection and timeout resilience
pub struct StatsClient {
    host: String,
    port: u16,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: SharedWriter,
    connected: bool,
    line_buffer: String,
    /// Read timeout per line (seconds)
    read_timeout_secs: u64,
    /// Connect timeout (seconds)
    connect_timeout_secs: u64,
    /// Total snapshots received since creation
    snapshots_received: u64,
    /// Total reconnections performed
    reconnections: u64,
    /// Total timeouts encountered
    timeouts: u64,
    /// Malformed lines skipped
    parse_errors: u64,
}

impl StatsClient {
    /// Create a new client with default timeouts.
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            reader: None,
            writer: Arc::new(Mutex::new(None)),
            connected: false,
            line_buffer: String::with_capacity(4096),
            read_timeout_secs: defaults::DEFAULT_READ_TIMEOUT_SECS,
            connect_timeout_secs: defaults::DEFAULT_CONNECT_TIMEOUT_SECS,
            snapshots_received: 0,
            reconnections: 0,
            timeouts: 0,
            parse_errors: 0,
        }
    }

    /// Set the per-read timeout (seconds).
    #[must_use]
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Set the connect timeout (seconds).
    #[must_use]
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Shared write-half handle for the poller and the command sink.
    #[must_use]
    pub fn requester(&self) -> TelemetryRequester {
        TelemetryRequester {
            writer: Arc::clone(&self.writer),
        }
    }

    /// Connect to the stats endpoint with timeout.
    pub async fn connect(&mut self) -> Result<(), TelemetryError> {
        if self.connected {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        tracing::info!(address = %addr, "Connecting to stats endpoint");

        let connect_timeout = tokio::time::Duration::from_secs(self.connect_timeout_secs);
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TelemetryError::Timeout)?
            .map_err(|e| TelemetryError::ConnectionFailed(e.to_string()))?;

        // Enable TCP keepalive to detect dead connections
        let sock_ref = socket2::SockRef::from(&stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(30))
            .with_interval(std::time::Duration::from_secs(10));
        let _ = sock_ref.set_tcp_keepalive(&keepalive);

        let (read_half, write_half) = stream.into_split();
        self.reader = Some(BufReader::new(read_half));
        *self.writer.lock().await = Some(write_half);
        self.connected = true;

        tracing::info!("Stats connection established");

        // Prime the endpoint so data flows before the first poll tick.
        if let Err(e) = self.requester().request_stats().await {
            tracing::warn!(error = %e, "Initial stats request failed");
        }
        Ok(())
    }

    /// Disconnect from the stats endpoint.
    ///
    /// Clears the shared write half first so the poller and command sink
    /// see `NotConnected` instead of writing into a dead socket.
    pub async fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.reader = None;
        self.connected = false;
        tracing::info!("Stats connection closed");
    }

    /// Reconnect with exponential backoff.
    ///
    /// Returns Ok(()) when reconnected, Err if max attempts exhausted.
    pub async fn reconnect(&mut self) -> Result<(), TelemetryError> {
        self.disconnect().await;

        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            let delay_secs = (INITIAL_RECONNECT_DELAY_SECS * 2u64.saturating_pow(attempt - 1))
                .min(MAX_RECONNECT_DELAY_SECS);

            tracing::warn!(
                attempt = attempt,
                max_attempts = MAX_RECONNECT_ATTEMPTS,
                delay_secs = delay_secs,
                "Stats endpoint reconnecting after failure"
            );

            tokio::time::sleep(tokio::time::Duration::from_secs(delay_secs)).await;

            match self.connect().await {
                Ok(()) => {
                    self.reconnections += 1;
                    tracing::info!(
                        attempt = attempt,
                        total_reconnections = self.reconnections,
                        "Stats reconnection successful"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt, error = %e, "Reconnection attempt failed");
                }
            }
        }

        tracing::error!(
            max_attempts = MAX_RECONNECT_ATTEMPTS,
            "Stats reconnection exhausted - all attempts failed"
        );
        Err(TelemetryError::ConnectionFailed(format!(
            "Failed to reconnect after {MAX_RECONNECT_ATTEMPTS} attempts"
        )))
    }

    /// Read the next snapshot with timeout handling.
    ///
    /// Automatically reconnects on timeout or connection drop. Malformed
    /// lines are logged, counted, and skipped without surfacing an error.
    pub async fn read_snapshot(&mut self) -> Result<UeSnapshot, TelemetryError> {
        if !self.connected {
            self.connect().await?;
        }

        match self.read_snapshot_inner().await {
            Ok(snapshot) => {
                self.snapshots_received += 1;
                Ok(snapshot)
            }
            Err(TelemetryError::Timeout) => {
                self.timeouts += 1;
                tracing::warn!(
                    timeout_secs = self.read_timeout_secs,
                    total_timeouts = self.timeouts,
                    "Telemetry read timeout - attempting reconnect"
                );
                self.reconnect().await?;
                self.read_snapshot_inner().await
            }
            Err(TelemetryError::ConnectionClosed) => {
                tracing::warn!("Stats connection closed by endpoint - attempting reconnect");
                self.reconnect().await?;
                self.read_snapshot_inner().await
            }
            Err(e) => Err(e),
        }
    }

    /// Inner line read with timeout - does NOT auto-reconnect.
    async fn read_snapshot_inner(&mut self) -> Result<UeSnapshot, TelemetryError> {
        let read_timeout = tokio::time::Duration::from_secs(self.read_timeout_secs);

        loop {
            let reader = self
                .reader
                .as_mut()
                .ok_or(TelemetryError::NotConnected)?;

            self.line_buffer.clear();
            let read_result =
                tokio::time::timeout(read_timeout, reader.read_line(&mut self.line_buffer)).await;

            let bytes = match read_result {
                Ok(Ok(b)) => b,
                Ok(Err(e)) => return Err(TelemetryError::ConnectionFailed(e.to_string())),
                Err(_) => return Err(TelemetryError::Timeout),
            };

            if bytes == 0 {
                return Err(TelemetryError::ConnectionClosed);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<UeSnapshot>(line) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    self.parse_errors += 1;
                    tracing::warn!(
                        error = %e,
                        total_parse_errors = self.parse_errors,
                        "Malformed telemetry line skipped"
                    );
                }
            }
        }
    }

    /// Check if connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
