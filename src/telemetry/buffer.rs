//! Shared throughput sample buffer
//!
//! Append-only log of [`RateSample`]s with a time-window query. Exactly one
//! writer (the ingest loop) and one reader (the sweep controller); a plain
//! std lock suffices because neither side ever holds it across an await.

use std::sync::{Arc, RwLock};
use tokio::time::Instant;

use crate::types::RateSample;

/// Cloneable handle to the shared sample log.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    inner: Arc<RwLock<Vec<RateSample>>>,
}

impl SampleBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample. The single writer stamps samples on arrival, so
    /// `observed_at` is non-decreasing across appends.
    pub fn append(&self, sample: RateSample) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sample);
    }

    /// Snapshot read: clone out every sample observed strictly after
    /// `since`. Samples appended after this call returns are not included.
    #[must_use]
    pub fn samples_since(&self, since: Instant) -> Vec<RateSample> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.observed_at > since)
            .copied()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Arithmetic mean of the samples' rates; 0 when there are none.
#[must_use]
pub fn mean_mbps(samples: &[RateSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.mbps).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UeKey;
    use std::time::Duration;
    use tokio::time::advance;

    fn sample(mbps: f64) -> RateSample {
        RateSample {
            ue: UeKey::nr(1),
            mbps,
            observed_at: Instant::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn window_query_is_strictly_after() {
        let buffer = SampleBuffer::new();
        let mark = Instant::now();

        // A sample stamped exactly at the mark is excluded.
        buffer.append(sample(1.0));
        advance(Duration::from_millis(100)).await;
        buffer.append(sample(2.0));
        advance(Duration::from_millis(100)).await;
        buffer.append(sample(3.0));

        let window = buffer.samples_since(mark);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].mbps, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_samples_never_leak_into_window() {
        let buffer = SampleBuffer::new();
        buffer.append(sample(99.0));
        advance(Duration::from_secs(1)).await;

        let dwell_start = Instant::now();
        advance(Duration::from_millis(50)).await;
        buffer.append(sample(5.0));

        let window = buffer.samples_since(dwell_start);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].mbps, 5.0);
        // The full log still holds everything.
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn mean_of_empty_window_is_zero() {
        assert_eq!(mean_mbps(&[]), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn mean_is_arithmetic_over_rates() {
        let samples = vec![sample(1.0), sample(2.0), sample(6.0)];
        assert!((mean_mbps(&samples) - 3.0).abs() < 1e-12);
    }
}
