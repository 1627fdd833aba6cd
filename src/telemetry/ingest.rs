//! Snapshot ingest loop shared across all input modes.
//!
//! Pulls UE snapshots from a [`SnapshotSource`], derives per-UE average
//! rates, feeds the shared sample buffer the controller dwells on, and
//! forwards stamped CSV records to the recorder task. The same loop serves
//! live TCP, stdin replay, and the simulated source.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sweep::SharedSweepState;
use crate::types::{LinkRecord, RateSample};

use super::buffer::SampleBuffer;
use super::rate::RateTracker;
use super::source::{SnapshotEvent, SnapshotSource};

/// Snapshots between progress log lines (about 30 s at the 1 Hz poll rate).
const PROGRESS_LOG_INTERVAL: u64 = 30;

/// Counters returned when the ingest loop exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    /// Snapshots decoded and processed.
    pub snapshots: u64,
    /// Per-UE records forwarded to the recorder.
    pub records: u64,
}

/// Owns the rate tracker and channels needed to process one snapshot stream.
pub struct IngestLoop {
    tracker: RateTracker,
    buffer: SampleBuffer,
    state: SharedSweepState,
    records: Option<mpsc::Sender<LinkRecord>>,
    cancel: CancellationToken,
}

impl IngestLoop {
    pub fn new(
        buffer: SampleBuffer,
        state: SharedSweepState,
        records: Option<mpsc::Sender<LinkRecord>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tracker: RateTracker::default(),
            buffer,
            state,
            records,
            cancel,
        }
    }

    /// Runs until the source is exhausted, errors, or cancellation fires.
    pub async fn run<S: SnapshotSource>(mut self, source: &mut S) -> IngestStats {
        let mut stats = IngestStats::default();

        info!("Ingesting UE stats from {}...", source.source_name());

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[StatsIngest] Shutdown signal received");
                    break;
                }
                result = source.next_snapshot() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!("[StatsIngest] Source error: {}", e);
                            break;
                        }
                    }
                }
            };

            let snapshot = match event {
                SnapshotEvent::Snapshot(s) => s,
                SnapshotEvent::Eof => {
                    info!(
                        "[StatsIngest] Source reached end ({} snapshots processed)",
                        stats.snapshots
                    );
                    break;
                }
            };

            stats.snapshots += 1;

            // One clock read per snapshot so every UE in it shares a timestamp.
            let observed_at = Instant::now();
            let logged_at = chrono::Local::now();
            let radio = self.state.snapshot();

            for reading in snapshot.readings() {
                let avg = self
                    .tracker
                    .update(reading.key, reading.total_dl_bytes, observed_at);
                self.buffer.append(RateSample {
                    ue: reading.key,
                    mbps: avg,
                    observed_at,
                });
                debug!("{} avg {:.3} Mbps", reading.key, avg);

                if let Some(ref tx) = self.records {
                    let record = LinkRecord::from_reading(
                        &reading,
                        avg,
                        logged_at,
                        radio.gain,
                        radio.noise_db,
                    );
                    match tx.try_send(record) {
                        Ok(()) => stats.records += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!("[StatsIngest] Record channel full - dropping record");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            warn!("[StatsIngest] Recorder gone - no further records will be kept");
                            self.records = None;
                        }
                    }
                }
            }

            if stats.snapshots % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "Progress: {} snapshots | {} records | {} UEs tracked",
                    stats.snapshots,
                    stats.records,
                    self.tracker.tracked_ues()
                );
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::source::ReplaySource;
    use crate::types::{QosFlow, UeEntry, UeSnapshot};

    fn nr_snapshot(total_bytes: u64) -> UeSnapshot {
        UeSnapshot {
            ue_list: vec![UeEntry {
                ran_ue_id: Some(1),
                enb_ue_id: None,
                cells: Vec::new(),
                qos_flow_list: vec![QosFlow {
                    dl_total_bytes: total_bytes,
                }],
                erab_list: Vec::new(),
            }],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn replayed_snapshots_fill_the_buffer() {
        let buffer = SampleBuffer::default();
        let state = SharedSweepState::new();
        let cancel = CancellationToken::new();
        let mut source = ReplaySource::new(
            vec![nr_snapshot(0), nr_snapshot(1_250_000)],
            1_000,
        );

        let ingest = IngestLoop::new(buffer.clone(), state, None, cancel);
        let stats = ingest.run(&mut source).await;

        assert_eq!(stats.snapshots, 2);
        assert_eq!(buffer.len(), 2);
        // 1.25 MB over one second is 10 Mbps; the first sample is the
        // no-prior-reading zero.
        let start = Instant::now() - tokio::time::Duration::from_secs(60);
        let samples = buffer.samples_since(start);
        assert!((samples[0].mbps - 0.0).abs() < f64::EPSILON);
        assert!((samples[1].mbps - 10.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshots_are_a_no_op() {
        let buffer = SampleBuffer::default();
        let state = SharedSweepState::new();
        let cancel = CancellationToken::new();
        let mut source = ReplaySource::new(vec![UeSnapshot::default()], 0);

        let ingest = IngestLoop::new(buffer.clone(), state, None, cancel);
        let stats = ingest.run(&mut source).await;

        assert_eq!(stats.snapshots, 1);
        assert_eq!(stats.records, 0);
        assert!(buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn records_are_stamped_with_current_radio_settings() {
        let buffer = SampleBuffer::default();
        let state = SharedSweepState::new();
        state.set_gain(crate::types::GainPair::new(45.0, 37.0));
        state.set_noise(-30.0);
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut source = ReplaySource::new(vec![nr_snapshot(100)], 0);

        let ingest = IngestLoop::new(buffer, state, Some(tx), cancel);
        let stats = ingest.run(&mut source).await;

        assert_eq!(stats.records, 1);
        let record = rx.try_recv().unwrap();
        assert!((record.gain_4g - 45.0).abs() < f64::EPSILON);
        assert!((record.gain_5g - 37.0).abs() < f64::EPSILON);
        assert_eq!(record.noise, Some(-30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let buffer = SampleBuffer::default();
        let state = SharedSweepState::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Endless pacing; only cancellation can end the run.
        let mut source = ReplaySource::new(
            std::iter::repeat(nr_snapshot(0)).take(1_000).collect(),
            60_000,
        );

        let ingest = IngestLoop::new(buffer, state, None, cancel);
        let stats = ingest.run(&mut source).await;

        assert!(stats.snapshots <= 1);
    }
}
