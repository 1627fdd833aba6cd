//! Per-UE downlink rate aggregation
//!
//! Snapshots carry cumulative byte counters, not rates. The tracker keeps
//! the last accepted reading per UE and differentiates consecutive readings
//! into a mean Mbps over the elapsed interval.

use std::collections::HashMap;
use tokio::time::Instant;

use crate::types::UeKey;

/// Last accepted reading for one UE.
#[derive(Debug, Clone, Copy)]
struct UeRateState {
    total_bytes: u64,
    observed_at: Instant,
}

/// Turns cumulative per-UE byte counters into windowed mean rates.
///
/// State is kept for the run's lifetime; UEs are rediscovered on every
/// snapshot, never expired.
#[derive(Debug, Default)]
pub struct RateTracker {
    states: HashMap<UeKey, UeRateState>,
}

impl RateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one reading into the tracker and return the mean downlink rate
    /// (Mbps) over the interval since the previous reading for this UE.
    ///
    /// The first reading for a UE initializes state and reports 0. A counter
    /// that moved backwards (stack restart) reports 0 and re-baselines; so
    /// does a non-positive elapsed interval. Stored state is always
    /// overwritten, so one bad reading can never wedge the tracker.
    pub fn update(&mut self, ue: UeKey, total_bytes: u64, observed_at: Instant) -> f64 {
        let mbps = match self.states.get(&ue) {
            None => 0.0,
            Some(prev) => {
                let dt = observed_at
                    .saturating_duration_since(prev.observed_at)
                    .as_secs_f64();
                if dt <= 0.0 || total_bytes < prev.total_bytes {
                    0.0
                } else {
                    ((total_bytes - prev.total_bytes) as f64 * 8.0) / (dt * 1_000_000.0)
                }
            }
        };

        self.states.insert(
            ue,
            UeRateState {
                total_bytes,
                observed_at,
            },
        );
        mbps
    }

    /// Number of distinct UEs seen so far.
    #[must_use]
    pub fn tracked_ues(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn first_reading_initializes_and_reports_zero() {
        let mut tracker = RateTracker::new();
        assert_eq!(tracker.update(UeKey::nr(1), 5_000, Instant::now()), 0.0);
        assert_eq!(tracker.tracked_ues(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_counters_yield_exact_rate() {
        let mut tracker = RateTracker::new();
        let ue = UeKey::nr(1);
        tracker.update(ue, 0, Instant::now());

        advance(Duration::from_secs(1)).await;
        // 125 000 bytes in 1 s = 1 Mbps exactly.
        let r = tracker.update(ue, 125_000, Instant::now());
        assert!((r - 1.0).abs() < 1e-9);

        advance(Duration::from_secs(2)).await;
        // 2 500 000 more bytes over 2 s = 10 Mbps.
        let r = tracker.update(ue, 2_625_000, Instant::now());
        assert!((r - 10.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_reset_reports_zero_then_rebaselines() {
        let mut tracker = RateTracker::new();
        let ue = UeKey::lte(4);
        tracker.update(ue, 1_000_000, Instant::now());

        advance(Duration::from_secs(1)).await;
        // Stack restarted: counter went backwards.
        assert_eq!(tracker.update(ue, 500, Instant::now()), 0.0);

        advance(Duration::from_secs(1)).await;
        // Next interval computes from the new baseline, not the old peak.
        let r = tracker.update(ue, 625_500, Instant::now());
        assert!((r - 5.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_elapsed_reports_zero() {
        let mut tracker = RateTracker::new();
        let ue = UeKey::nr(2);
        let now = Instant::now();
        tracker.update(ue, 100, now);
        assert_eq!(tracker.update(ue, 10_000, now), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn ues_are_tracked_independently() {
        let mut tracker = RateTracker::new();
        tracker.update(UeKey::nr(1), 1_000, Instant::now());
        advance(Duration::from_secs(1)).await;
        // Same numeric id on the other RAT is a fresh entity.
        assert_eq!(tracker.update(UeKey::lte(1), 999_999, Instant::now()), 0.0);
        assert_eq!(tracker.tracked_ues(), 2);
    }
}
