//! Performance-envelope sweep engine.
//!
//! ```text
//! SweepPlan ──> SweepController ──dwell──> SampleBuffer (read)
//!                   │    │
//!                   │    └─fail─> RecoveryPlan ──> SweepContext / traffic
//!                   │
//!               SharedSweepState (gain, noise, progress)
//! ```
//!
//! The controller owns the traversal; everything it commands goes through
//! [`crate::control::SweepContext`] so records and the simulated source see
//! the same radio state.

mod controller;
mod grid;
mod recovery;
mod state;

pub use controller::SweepController;
pub use grid::SweepPlan;
pub use recovery::{ramp_gain_steps, RecoveryAction, RecoveryPlan, RecoveryStep};
pub use state::{SharedSweepState, SweepState};
