//! Sweep plan generation and traversal.
//!
//! The grid is ordered gain-pair-major: every noise level is visited at one
//! gain pair before the next pair is touched. Abandoning a pair therefore
//! skips a contiguous run of upcoming points.

use crate::config::GridConfig;
use crate::types::{GainPair, GridPoint};

/// Ordered list of grid points with a traversal cursor.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    points: Vec<GridPoint>,
    cursor: usize,
}

impl SweepPlan {
    /// Expands the configured axes into the full point list.
    #[must_use]
    pub fn generate(grid: &GridConfig) -> Self {
        let mut points = Vec::with_capacity(grid.gain_pairs_db.len() * grid.noise_levels_db.len());
        for pair in grid.gain_pairs() {
            for &noise_db in &grid.noise_levels_db {
                points.push(GridPoint::new(pair, noise_db));
            }
        }
        Self { points, cursor: 0 }
    }

    /// Total points in the plan, independent of traversal progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point the cursor is on, or `None` once the plan is exhausted.
    #[must_use]
    pub fn current(&self) -> Option<GridPoint> {
        self.points.get(self.cursor).copied()
    }

    /// Moves past the current point.
    pub fn advance(&mut self) {
        if self.cursor < self.points.len() {
            self.cursor += 1;
        }
    }

    /// Skips every upcoming point that shares `pair`, returning the skipped
    /// points in order. Later occurrences of the same gain values under a
    /// different pair entry are not affected.
    pub fn skip_remaining_in_pair(&mut self, pair: GainPair) -> Vec<GridPoint> {
        let mut skipped = Vec::new();
        while let Some(point) = self.current() {
            if point.gain != pair {
                break;
            }
            skipped.push(point);
            self.cursor += 1;
        }
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridConfig {
        GridConfig {
            gain_pairs_db: vec![[80.0, 80.0], [60.0, 60.0], [40.0, 40.0]],
            noise_levels_db: vec![-50.0, -30.0, -10.0],
        }
    }

    #[test]
    fn generates_gain_pair_major_order() {
        let plan = SweepPlan::generate(&grid());
        assert_eq!(plan.len(), 9);

        let mut plan = plan;
        let mut visited = Vec::new();
        while let Some(p) = plan.current() {
            visited.push(p);
            plan.advance();
        }

        // First pair covers all noise levels before the second pair starts.
        assert_eq!(visited[0], GridPoint::new(GainPair::uniform(80.0), -50.0));
        assert_eq!(visited[1], GridPoint::new(GainPair::uniform(80.0), -30.0));
        assert_eq!(visited[2], GridPoint::new(GainPair::uniform(80.0), -10.0));
        assert_eq!(visited[3], GridPoint::new(GainPair::uniform(60.0), -50.0));
        assert_eq!(visited[8], GridPoint::new(GainPair::uniform(40.0), -10.0));
    }

    #[test]
    fn skip_consumes_only_the_current_pair() {
        let mut plan = SweepPlan::generate(&grid());
        // Abandon at (80, 80) / -30: the -50 point already passed, -30
        // itself was reported by the caller.
        plan.advance();
        plan.advance();

        let skipped = plan.skip_remaining_in_pair(GainPair::uniform(80.0));
        assert_eq!(
            skipped,
            vec![GridPoint::new(GainPair::uniform(80.0), -10.0)]
        );
        assert_eq!(
            plan.current(),
            Some(GridPoint::new(GainPair::uniform(60.0), -50.0))
        );
    }

    #[test]
    fn skip_on_the_last_pair_exhausts_the_plan() {
        let mut plan = SweepPlan::generate(&grid());
        for _ in 0..6 {
            plan.advance();
        }

        let skipped = plan.skip_remaining_in_pair(GainPair::uniform(40.0));
        assert_eq!(skipped.len(), 3);
        assert!(plan.current().is_none());
    }

    #[test]
    fn empty_axes_make_an_empty_plan() {
        let plan = SweepPlan::generate(&GridConfig {
            gain_pairs_db: Vec::new(),
            noise_levels_db: vec![-10.0],
        });
        assert!(plan.is_empty());
        assert!(plan.current().is_none());
    }
}
