//! Shared radio state published by the sweep controller.
//!
//! The controller is the only writer; the ingest loop and the simulated
//! source read the current gain and noise settings when stamping records
//! and modeling throughput. The handle is cheap to clone and safe to
//! share across tasks.

use std::sync::{Arc, RwLock};

use crate::types::{GainPair, GridPoint, SweepStatus};

/// Snapshot of the radio settings and sweep progress at one instant.
#[derive(Debug, Clone, Default)]
pub struct SweepState {
    /// Most recently commanded gain pair, in dB.
    pub gain: GainPair,
    /// Most recently commanded noise level in dB, `None` before the first
    /// noise command is sent.
    pub noise_db: Option<f64>,
    /// Lifecycle phase of the sweep.
    pub status: SweepStatus,
    /// Grid point currently being dwelled on, if any.
    pub current_point: Option<GridPoint>,
    /// Points resolved so far (passed, abandoned, or skipped).
    pub points_done: usize,
    /// Total points in the sweep plan.
    pub points_total: usize,
}

/// Cloneable handle to the shared [`SweepState`].
#[derive(Debug, Clone, Default)]
pub struct SharedSweepState {
    inner: Arc<RwLock<SweepState>>,
}

impl SharedSweepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SweepState {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_gain(&self, gain: GainPair) {
        self.write().gain = gain;
    }

    pub fn set_noise(&self, noise_db: f64) {
        self.write().noise_db = Some(noise_db);
    }

    pub fn set_status(&self, status: SweepStatus) {
        self.write().status = status;
    }

    pub fn set_total(&self, total: usize) {
        self.write().points_total = total;
    }

    /// Marks `point` as the one currently being characterized.
    pub fn begin_point(&self, point: GridPoint) {
        self.write().current_point = Some(point);
    }

    /// Clears the current point and counts it as resolved.
    pub fn finish_point(&self) {
        let mut state = self.write();
        state.current_point = None;
        state.points_done += 1;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SweepState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
