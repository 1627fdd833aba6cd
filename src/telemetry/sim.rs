//! Simulated UE stats source.
//!
//! Emits synthetic `ue_get` snapshots whose throughput responds to the gain
//! and noise settings currently published in [`SharedSweepState`], closing
//! the loop so a full sweep can run without radio hardware. One NR UE and
//! one LTE UE are modeled, each following its own gain axis.
//!
//! The link model is deliberately simple: a margin in dB derived from gain
//! and injected noise, mapped linearly onto throughput and clamped to the
//! rate the traffic generator would offer.

use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::Normal;
use tokio::time::Duration;

use crate::sweep::SharedSweepState;
use crate::types::{CellMetrics, ErabSession, QosFlow, UeEntry, UeSnapshot};

use super::source::{SnapshotEvent, SnapshotSource};

/// Offered load ceiling, matching the iperf bandwidth cap.
const PEAK_RATE_MBPS: f64 = 230.0;
/// Gain below which the modeled link carries nothing, in dB.
const GAIN_FLOOR_DB: f64 = 25.0;
/// Margin lost per dB of injected noise above the quiet floor.
const NOISE_SLOPE: f64 = 0.8;
/// Quietest injectable noise level; `None` in the shared state maps here.
const QUIET_NOISE_DB: f64 = -50.0;
/// Throughput gained per dB of margin above the demodulation threshold.
const RATE_SLOPE_MBPS_PER_DB: f64 = 6.0;
/// Margin required before any traffic decodes, in dB.
const DEMOD_THRESHOLD_DB: f64 = 3.0;
/// Standard deviation of the per-tick throughput jitter, Mbps.
const JITTER_SIGMA_MBPS: f64 = 2.0;

const SIM_NR_UE_ID: u64 = 1;
const SIM_LTE_UE_ID: u64 = 2;

/// Closed-loop synthetic stats source.
pub struct SimSource {
    state: SharedSweepState,
    tick: Duration,
    rng: StdRng,
    jitter: Normal<f64>,
    nr_total_bytes: u64,
    lte_total_bytes: u64,
    started: bool,
}

impl SimSource {
    /// Creates a source that emits one snapshot per `tick`, reading radio
    /// settings from `state`. Pass a seed for reproducible runs.
    pub fn new(state: SharedSweepState, tick: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            state,
            tick,
            rng,
            jitter: Normal::new(0.0, JITTER_SIGMA_MBPS).expect("jitter sigma is finite"),
            nr_total_bytes: 0,
            lte_total_bytes: 0,
            started: false,
        }
    }

    /// Link margin in dB for one axis at the given gain and noise settings.
    fn margin_db(gain_db: f64, noise_db: f64) -> f64 {
        gain_db - GAIN_FLOOR_DB - NOISE_SLOPE * (noise_db - QUIET_NOISE_DB)
    }

    /// Modeled throughput in Mbps before jitter.
    fn nominal_mbps(margin_db: f64) -> f64 {
        (RATE_SLOPE_MBPS_PER_DB * (margin_db - DEMOD_THRESHOLD_DB)).clamp(0.0, PEAK_RATE_MBPS)
    }

    fn axis_mbps(&mut self, gain_db: f64, noise_db: f64) -> (f64, f64) {
        let margin = Self::margin_db(gain_db, noise_db);
        let nominal = Self::nominal_mbps(margin);
        // A dead link stays dead; jitter only perturbs a live one.
        let mbps = if nominal > 0.0 {
            (nominal + self.jitter.sample(&mut self.rng)).max(0.0)
        } else {
            0.0
        };
        (mbps, margin)
    }

    fn cell(mbps: f64, margin: f64, noise_db: f64) -> CellMetrics {
        let quality = (margin / 40.0).clamp(0.0, 1.0);
        CellMetrics {
            dl_bitrate: mbps * 1_000_000.0,
            epre: Some(-95.0 + margin),
            ul_path_loss: Some(100.0 - margin),
            p_ue: Some(10.0),
            ul_phr: Some(20.0 * quality),
            pucch1_snr: Some(margin - 5.0),
            pusch_snr: Some(margin),
            cqi: Some((15.0 * quality).round()),
            ri: Some(if quality > 0.5 { 2.0 } else { 1.0 }),
            dl_mcs: Some((27.0 * quality).round()),
            ul_mcs: Some((23.0 * quality).round()),
            ul_n_layer: Some(1.0),
            ul_rank: Some(1.0),
            dl_retx: Some(if margin < 10.0 { 3.0 } else { 0.0 }),
            ul_retx: Some(0.0),
            dl_err: Some(0.0),
            ul_err: Some((noise_db - QUIET_NOISE_DB).max(0.0) / 10.0),
        }
    }

    fn tick_snapshot(&mut self) -> UeSnapshot {
        let radio = self.state.snapshot();
        let noise_db = radio.noise_db.unwrap_or(QUIET_NOISE_DB);
        let tick_secs = self.tick.as_secs_f64();

        let (nr_mbps, nr_margin) = self.axis_mbps(radio.gain.nr, noise_db);
        let (lte_mbps, lte_margin) = self.axis_mbps(radio.gain.lte, noise_db);

        self.nr_total_bytes += (nr_mbps * 1_000_000.0 / 8.0 * tick_secs) as u64;
        self.lte_total_bytes += (lte_mbps * 1_000_000.0 / 8.0 * tick_secs) as u64;

        let nr_ue = UeEntry {
            ran_ue_id: Some(SIM_NR_UE_ID),
            enb_ue_id: None,
            cells: vec![Self::cell(nr_mbps, nr_margin, noise_db)],
            qos_flow_list: vec![QosFlow {
                dl_total_bytes: self.nr_total_bytes,
            }],
            erab_list: Vec::new(),
        };
        let lte_ue = UeEntry {
            ran_ue_id: None,
            enb_ue_id: Some(SIM_LTE_UE_ID),
            cells: vec![Self::cell(lte_mbps, lte_margin, noise_db)],
            qos_flow_list: Vec::new(),
            erab_list: vec![ErabSession {
                dl_total_bytes: self.lte_total_bytes,
            }],
        };

        UeSnapshot {
            ue_list: vec![nr_ue, lte_ue],
        }
    }
}

#[async_trait]
impl SnapshotSource for SimSource {
    async fn next_snapshot(&mut self) -> anyhow::Result<SnapshotEvent> {
        if self.started {
            tokio::time::sleep(self.tick).await;
        } else {
            self.started = true;
        }
        Ok(SnapshotEvent::Snapshot(self.tick_snapshot()))
    }

    fn source_name(&self) -> &str {
        "simulation"
    }
}
