//! Core sweep domain types
//!
//! Grid coordinates, RF commands, throughput samples, and per-point
//! outcomes shared by the ingest and control timelines.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use super::snapshot::UeKey;

/// Gain settings for the two radio axes, in dB.
///
/// The LTE and NR front-ends are attenuated independently; a sweep point
/// carries one value per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GainPair {
    pub lte: f64,
    pub nr: f64,
}

impl GainPair {
    #[must_use]
    pub const fn new(lte: f64, nr: f64) -> Self {
        Self { lte, nr }
    }

    /// Same gain on both axes (safe-state and simple grids).
    #[must_use]
    pub const fn uniform(db: f64) -> Self {
        Self { lte: db, nr: db }
    }
}

impl fmt::Display for GainPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lte, self.nr)
    }
}

/// One coordinate of the sweep grid. Immutable once the plan is generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub gain: GainPair,
    pub noise_db: f64,
}

impl GridPoint {
    #[must_use]
    pub const fn new(gain: GainPair, noise_db: f64) -> Self {
        Self { gain, noise_db }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gain {} / noise {} dB", self.gain, self.noise_db)
    }
}

/// Fire-and-forget RF front-end command. No acknowledgment is ever awaited;
/// delivery failure surfaces only as a later failed dwell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RfCommand {
    SetGain(GainPair),
    SetNoise(f64),
}

impl fmt::Display for RfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetGain(pair) => write!(f, "set_gain {pair}"),
            Self::SetNoise(db) => write!(f, "set_noise {db} dB"),
        }
    }
}

/// One derived throughput observation for one UE.
///
/// `observed_at` is a tokio [`Instant`] so that dwell-window queries share
/// the control timeline's clock.
#[derive(Debug, Clone, Copy)]
pub struct RateSample {
    pub ue: UeKey,
    /// Windowed mean downlink rate, Mbps, never negative.
    pub mbps: f64,
    pub observed_at: Instant,
}

/// Outcome of a single dwell attempt at one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellResult {
    pub point: GridPoint,
    /// Arithmetic mean over samples observed during the dwell; 0 when none.
    pub mean_mbps: f64,
    pub sample_count: usize,
    pub passed: bool,
}

/// Final disposition of a grid point after the sweep has moved past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOutcome {
    /// A dwell at this point sustained usable traffic.
    Passed,
    /// Every attempt failed; retries exhausted.
    Abandoned,
    /// Never attempted: an earlier point with the same gain pair was
    /// abandoned.
    Skipped,
}

impl fmt::Display for PointOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Abandoned => "abandoned",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Summary entry for one grid point, kept for the end-of-sweep report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointReport {
    pub point: GridPoint,
    /// Dwell attempts actually performed (0 for skipped points).
    pub attempts: u32,
    /// Mean Mbps of the deciding dwell (the passing one, or the last failed).
    pub mean_mbps: f64,
    pub outcome: PointOutcome,
}

/// Coarse lifecycle of the sweep, published through the shared state for
/// record stamping and operator logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SweepStatus {
    #[default]
    Idle,
    Running,
    Recovering,
    Complete,
    Cancelled,
}

impl fmt::Display for SweepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Recovering => "recovering",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
