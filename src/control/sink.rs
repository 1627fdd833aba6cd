//! RF command dispatch.
//!
//! Abstracts where gain and noise commands go so backends can be swapped:
//! - `TcpCommandSink`: the live stats endpoint (shares the poller's socket)
//! - `NullSink`: discards commands (replay and simulation modes)
//! - `RecordingSink`: captures commands for inspection in tests
//!
//! Commands are fire-and-forget. A send failure is logged and the sweep
//! carries on; the shared state is stamped with the commanded value either
//! way so records always reflect what was asked of the radio.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::sweep::SharedSweepState;
use crate::telemetry::client::MESSAGE_ID;
use crate::telemetry::{TelemetryError, TelemetryRequester};
use crate::types::{GainPair, RfCommand};

/// Channel index the noise generator listens on.
const NOISE_CHANNEL: u32 = 2;

/// Trait for RF command backends.
///
/// Every implementation must be thread-safe (Send + Sync) since the sweep
/// controller shares the sink across async tasks.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Dispatch one command to the radio.
    async fn send(&self, command: RfCommand) -> Result<(), TelemetryError>;

    /// Get the sink name for logging
    fn sink_name(&self) -> &'static str;
}

/// Sink that writes commands to the live stats endpoint.
///
/// Gain commands drive both rx and tx attenuators; the three-element arrays
/// cover the LTE cell and both NR carriers, with the NR gain repeated.
pub struct TcpCommandSink {
    requester: TelemetryRequester,
}

impl TcpCommandSink {
    #[must_use]
    pub fn new(requester: TelemetryRequester) -> Self {
        Self { requester }
    }
}

#[async_trait]
impl CommandSink for TcpCommandSink {
    async fn send(&self, command: RfCommand) -> Result<(), TelemetryError> {
        let message = match command {
            RfCommand::SetGain(pair) => {
                let gains = [pair.lte, pair.nr, pair.nr];
                serde_json::json!({
                    "message": "rf_gain",
                    "rx_gain": gains,
                    "tx_gain": gains,
                    "message_id": MESSAGE_ID,
                })
            }
            RfCommand::SetNoise(level_db) => serde_json::json!({
                "message": "noise_level",
                "noise_level": level_db,
                "channel": NOISE_CHANNEL,
                "message_id": MESSAGE_ID,
            }),
        };
        self.requester.send_json(&message).await
    }

    fn sink_name(&self) -> &'static str {
        "stats-tcp"
    }
}

/// Sink that discards every command.
///
/// Used in replay and simulation modes where no radio is attached. Always
/// succeeds since "no radio" is a valid operational state.
pub struct NullSink;

#[async_trait]
impl CommandSink for NullSink {
    async fn send(&self, _command: RfCommand) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "null"
    }
}

/// Sink that appends every command to an in-memory list.
pub struct RecordingSink {
    sent: Mutex<Vec<RfCommand>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of everything sent so far, in order.
    pub fn sent(&self) -> Vec<RfCommand> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, command: RfCommand) -> Result<(), TelemetryError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command);
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// Command dispatch plus state stamping, shared by the controller and the
/// recovery procedure.
#[derive(Clone)]
pub struct SweepContext {
    sink: Arc<dyn CommandSink>,
    state: SharedSweepState,
}

impl SweepContext {
    pub fn new(sink: Arc<dyn CommandSink>, state: SharedSweepState) -> Self {
        Self { sink, state }
    }

    /// Command a gain pair and publish it to the shared state.
    pub async fn set_gain(&self, gain: GainPair) {
        info!("RF gain -> {} dB", gain);
        if let Err(e) = self.sink.send(RfCommand::SetGain(gain)).await {
            warn!(sink = self.sink.sink_name(), error = %e, "Gain command failed");
        }
        self.state.set_gain(gain);
    }

    /// Command a noise level and publish it to the shared state.
    pub async fn set_noise(&self, level_db: f64) {
        info!("Noise level -> {} dB", level_db);
        if let Err(e) = self.sink.send(RfCommand::SetNoise(level_db)).await {
            warn!(sink = self.sink.sink_name(), error = %e, "Noise command failed");
        }
        self.state.set_noise(level_db);
    }

    #[must_use]
    pub fn state(&self) -> &SharedSweepState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.send(RfCommand::SetGain(GainPair::uniform(80.0)))
            .await
            .unwrap();
        sink.send(RfCommand::SetNoise(-40.0)).await.unwrap();

        assert_eq!(
            sink.sent(),
            vec![
                RfCommand::SetGain(GainPair::uniform(80.0)),
                RfCommand::SetNoise(-40.0),
            ]
        );
    }

    #[tokio::test]
    async fn context_stamps_state_even_when_send_fails() {
        // A disconnected requester rejects every send.
        let requester = crate::telemetry::StatsClient::new("127.0.0.1", 1).requester();
        let sink: Arc<dyn CommandSink> = Arc::new(TcpCommandSink::new(requester));
        let state = SharedSweepState::new();
        let ctx = SweepContext::new(sink, state.clone());

        ctx.set_gain(GainPair::new(45.0, 37.0)).await;
        ctx.set_noise(-20.0).await;

        let snap = state.snapshot();
        assert_eq!(snap.gain, GainPair::new(45.0, 37.0));
        assert_eq!(snap.noise_db, Some(-20.0));
    }

    #[tokio::test]
    async fn null_sink_accepts_everything() {
        let sink: Box<dyn CommandSink> = Box::new(NullSink);
        assert!(sink.send(RfCommand::SetNoise(0.0)).await.is_ok());
        assert_eq!(sink.sink_name(), "null");
    }
}
