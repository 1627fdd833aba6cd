//! Link recovery after a failed dwell.
//!
//! A dwell that measures no usable throughput usually means the UE lost
//! sync or detached. The recovery sequence walks the radio back to a state
//! the UE is known to survive, lets it re-attach, then ramps gain down to
//! the failed point in small steps so the link is never yanked straight
//! into the hostile setting:
//!
//! 1. stop traffic, settle
//! 2. quietest noise, safe gain, hold for re-attach
//! 3. ramp gain stepwise to the target pair
//! 4. restore the point's noise level
//! 5. restart traffic, hold for network stabilization
//!
//! The plan is built up front as data so tests can assert the exact
//! command order without running the radio.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RecoveryConfig;
use crate::control::{SweepContext, TrafficGenerator};
use crate::types::{GainPair, GridPoint};

use tokio::time::Duration;

/// One effect in a recovery sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryAction {
    StopTraffic,
    SetGain(GainPair),
    SetNoise(f64),
    StartTraffic,
}

/// An action plus the hold time that follows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryStep {
    pub action: RecoveryAction,
    pub wait_after: Duration,
}

/// Gain values visited while ramping from `from` to `to`.
///
/// Each axis moves toward its own target by at most `step_db` per element
/// and never overshoots; the final element is exactly `to`. When the axes
/// need a different number of steps, the one that arrives first holds its
/// target while the other catches up. A non-positive step degenerates to a
/// single jump.
#[must_use]
pub fn ramp_gain_steps(from: GainPair, to: GainPair, step_db: f64) -> Vec<GainPair> {
    if step_db <= 0.0 {
        return vec![to];
    }

    let mut steps = Vec::new();
    let mut cursor = from;
    while cursor != to {
        cursor = GainPair::new(
            step_toward(cursor.lte, to.lte, step_db),
            step_toward(cursor.nr, to.nr, step_db),
        );
        steps.push(cursor);
    }
    if steps.is_empty() {
        // Already at the target; re-assert it anyway, the radio state is
        // not trusted after a failed dwell.
        steps.push(to);
    }
    steps
}

fn step_toward(current: f64, target: f64, step_db: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= step_db {
        target
    } else {
        current + step_db.copysign(delta)
    }
}

/// Ordered recovery steps for one failed grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    steps: Vec<RecoveryStep>,
}

impl RecoveryPlan {
    /// Builds the sequence that walks the radio from the failed state at
    /// `point` back to `point` via the configured safe state.
    #[must_use]
    pub fn for_point(point: GridPoint, cfg: &RecoveryConfig, quietest_noise_db: f64) -> Self {
        let safe = GainPair::uniform(cfg.safe_gain_db);
        let mut steps = vec![
            RecoveryStep {
                action: RecoveryAction::StopTraffic,
                wait_after: cfg.settle_delay(),
            },
            RecoveryStep {
                action: RecoveryAction::SetNoise(quietest_noise_db),
                wait_after: Duration::ZERO,
            },
            RecoveryStep {
                action: RecoveryAction::SetGain(safe),
                wait_after: cfg.stabilize_delay(),
            },
        ];

        for gain in ramp_gain_steps(safe, point.gain, cfg.ramp_step_db) {
            steps.push(RecoveryStep {
                action: RecoveryAction::SetGain(gain),
                wait_after: cfg.ramp_step_delay(),
            });
        }

        steps.push(RecoveryStep {
            action: RecoveryAction::SetNoise(point.noise_db),
            wait_after: Duration::ZERO,
        });
        steps.push(RecoveryStep {
            action: RecoveryAction::StartTraffic,
            wait_after: cfg.net_stabilize_delay(),
        });

        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[RecoveryStep] {
        &self.steps
    }

    /// Runs every step in order, sleeping out each hold time.
    ///
    /// Returns `false` if cancellation fired before the sequence finished;
    /// remaining steps are not executed. Traffic and command failures are
    /// logged and do not abort the sequence.
    pub async fn execute(
        &self,
        ctx: &SweepContext,
        traffic: &dyn TrafficGenerator,
        cancel: &CancellationToken,
    ) -> bool {
        info!("Recovery sequence: {} steps", self.steps.len());

        for step in &self.steps {
            if cancel.is_cancelled() {
                return false;
            }

            match step.action {
                RecoveryAction::StopTraffic => {
                    if let Err(e) = traffic.stop().await {
                        warn!("Recovery: traffic stop failed: {}", e);
                    }
                }
                RecoveryAction::SetGain(gain) => ctx.set_gain(gain).await,
                RecoveryAction::SetNoise(level_db) => ctx.set_noise(level_db).await,
                RecoveryAction::StartTraffic => {
                    if let Err(e) = traffic.start().await {
                        warn!("Recovery: traffic start failed: {}", e);
                    }
                }
            }

            if step.wait_after > Duration::ZERO {
                tokio::select! {
                    _ = cancel.cancelled() => return false,
                    _ = tokio::time::sleep(step.wait_after) => {}
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{CommandSink, NoopTraffic, TrafficError};
    use crate::sweep::SharedSweepState;
    use crate::types::RfCommand;
    use std::sync::{Arc, Mutex};

    #[test]
    fn ramp_reaches_each_target_exactly() {
        let steps = ramp_gain_steps(GainPair::uniform(80.0), GainPair::new(45.0, 37.0), 5.0);

        // LTE needs 7 steps, NR needs 9; the sequence runs until both land.
        assert_eq!(steps.len(), 9);
        assert_eq!(steps[6].lte, 45.0);
        assert_eq!(*steps.last().unwrap(), GainPair::new(45.0, 37.0));

        // No overshoot on the way down.
        for step in &steps {
            assert!(step.lte >= 45.0);
            assert!(step.nr >= 37.0);
        }
    }

    #[test]
    fn ramp_moves_up_when_the_target_is_above_safe() {
        let steps = ramp_gain_steps(GainPair::uniform(80.0), GainPair::uniform(90.0), 5.0);
        assert_eq!(
            steps,
            vec![GainPair::uniform(85.0), GainPair::uniform(90.0)]
        );
    }

    #[test]
    fn ramp_from_target_to_itself_restates_it_once() {
        let steps = ramp_gain_steps(GainPair::uniform(80.0), GainPair::uniform(80.0), 5.0);
        assert_eq!(steps, vec![GainPair::uniform(80.0)]);
    }

    #[test]
    fn fractional_remainder_lands_on_target() {
        let steps = ramp_gain_steps(GainPair::uniform(50.0), GainPair::new(43.5, 50.0), 5.0);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], GainPair::new(45.0, 50.0));
        assert_eq!(steps[1], GainPair::new(43.5, 50.0));
    }

    /// Sink and traffic generator sharing one event journal, so ordering
    /// across both can be asserted.
    struct JournalSink(Arc<Mutex<Vec<String>>>);
    struct JournalTraffic(Arc<Mutex<Vec<String>>>);

    #[async_trait::async_trait]
    impl CommandSink for JournalSink {
        async fn send(&self, command: RfCommand) -> Result<(), crate::telemetry::TelemetryError> {
            self.0.lock().unwrap().push(format!("{}", command));
            Ok(())
        }
        fn sink_name(&self) -> &'static str {
            "journal"
        }
    }

    #[async_trait::async_trait]
    impl TrafficGenerator for JournalTraffic {
        async fn start(&self) -> Result<(), TrafficError> {
            self.0.lock().unwrap().push("traffic start".to_string());
            Ok(())
        }
        async fn stop(&self) -> Result<(), TrafficError> {
            self.0.lock().unwrap().push("traffic stop".to_string());
            Ok(())
        }
        fn generator_name(&self) -> &'static str {
            "journal"
        }
    }

    fn quick_recovery() -> RecoveryConfig {
        RecoveryConfig {
            safe_gain_db: 80.0,
            ramp_step_db: 10.0,
            ramp_step_delay_secs: 0.001,
            settle_delay_secs: 0.001,
            stabilize_delay_secs: 0.001,
            net_stabilize_delay_secs: 0.001,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn execute_follows_the_documented_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = SweepContext::new(
            Arc::new(JournalSink(Arc::clone(&journal))),
            SharedSweepState::new(),
        );
        let traffic = JournalTraffic(Arc::clone(&journal));
        let cancel = CancellationToken::new();

        let point = GridPoint::new(GainPair::uniform(60.0), -20.0);
        let plan = RecoveryPlan::for_point(point, &quick_recovery(), -50.0);
        assert!(plan.execute(&ctx, &traffic, &cancel).await);

        let events = journal.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "traffic stop".to_string(),
                "set_noise -50 dB".to_string(),
                "set_gain (80, 80)".to_string(),
                "set_gain (70, 70)".to_string(),
                "set_gain (60, 60)".to_string(),
                "set_noise -20 dB".to_string(),
                "traffic start".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn execute_stops_at_cancellation() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = SweepContext::new(
            Arc::new(JournalSink(Arc::clone(&journal))),
            SharedSweepState::new(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let point = GridPoint::new(GainPair::uniform(60.0), -20.0);
        let plan = RecoveryPlan::for_point(point, &quick_recovery(), -50.0);
        assert!(!plan.execute(&ctx, &NoopTraffic, &cancel).await);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn plan_restores_the_points_noise_last() {
        let point = GridPoint::new(GainPair::uniform(40.0), 0.0);
        let plan = RecoveryPlan::for_point(point, &quick_recovery(), -50.0);
        let steps = plan.steps();

        assert_eq!(steps[0].action, RecoveryAction::StopTraffic);
        assert_eq!(steps[1].action, RecoveryAction::SetNoise(-50.0));
        let n = steps.len();
        assert_eq!(steps[n - 2].action, RecoveryAction::SetNoise(0.0));
        assert_eq!(steps[n - 1].action, RecoveryAction::StartTraffic);
    }
}
