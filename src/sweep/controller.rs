//! Grid sweep orchestration.
//!
//! Walks the plan point by point: command the gain pair and noise level,
//! dwell while the ingest loop fills the sample buffer, then judge the
//! window's mean rate against the throughput floor. A failed dwell always
//! runs the recovery sequence; the point is then retried until its retry
//! budget is gone, at which point it is abandoned and the rest of its gain
//! pair is skipped outright.

use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{RecoveryConfig, SweepConfig};
use crate::control::{SweepContext, TrafficGenerator};
use crate::telemetry::{mean_mbps, SampleBuffer};
use crate::types::{DwellResult, GridPoint, PointOutcome, PointReport, SweepStatus};

use super::grid::SweepPlan;
use super::recovery::RecoveryPlan;

/// What to do with a grid point once its dwell window has been judged.
///
/// Pure decision, separated from the executor so the retry ladder can be
/// checked without running dwells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointStep {
    /// Passed; move on to the next grid point.
    Advance,
    /// Failed with budget left; recover, then dwell the same point again.
    RecoverAndRetry,
    /// Failed on the final attempt; recover, then abandon the gain pair.
    RecoverAndAbandon,
}

const fn next_step(passed: bool, retries_left: u32) -> PointStep {
    if passed {
        PointStep::Advance
    } else if retries_left > 0 {
        PointStep::RecoverAndRetry
    } else {
        PointStep::RecoverAndAbandon
    }
}

/// Runs one full characterization sweep and reports every grid point.
pub struct SweepController {
    plan: SweepPlan,
    ctx: SweepContext,
    buffer: SampleBuffer,
    traffic: Arc<dyn TrafficGenerator>,
    cancel: CancellationToken,
    dwell: Duration,
    min_throughput_mbps: f64,
    max_retries: u32,
    recovery_cfg: RecoveryConfig,
    quietest_noise_db: f64,
}

impl SweepController {
    pub fn new(
        cfg: &SweepConfig,
        ctx: SweepContext,
        buffer: SampleBuffer,
        traffic: Arc<dyn TrafficGenerator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            plan: SweepPlan::generate(&cfg.grid),
            ctx,
            buffer,
            traffic,
            cancel,
            dwell: cfg.dwell.dwell(),
            min_throughput_mbps: cfg.dwell.min_throughput_mbps,
            max_retries: cfg.dwell.max_retries,
            recovery_cfg: cfg.recovery.clone(),
            quietest_noise_db: cfg.grid.quietest_noise_db(),
        }
    }

    /// Runs the sweep to completion or cancellation.
    ///
    /// Every grid point appears in the returned reports exactly once,
    /// except points still pending when cancellation fired.
    pub async fn run(mut self) -> Vec<PointReport> {
        let total = self.plan.len();
        let state = self.ctx.state().clone();
        state.set_total(total);
        state.set_status(SweepStatus::Running);

        info!(
            "Starting sweep: {} grid points, {:.1}s dwell, {} retries per point",
            total,
            self.dwell.as_secs_f64(),
            self.max_retries
        );

        if let Err(e) = self.traffic.start().await {
            warn!("Traffic start failed: {}", e);
        }

        let mut reports: Vec<PointReport> = Vec::with_capacity(total);
        let mut cancelled = false;

        'sweep: while let Some(point) = self.plan.current() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            state.begin_point(point);
            info!("Point {}/{}: {}", reports.len() + 1, total, point);

            let mut attempts = 0u32;
            let mut retries_left = self.max_retries;
            loop {
                attempts += 1;
                let Some(result) = self.dwell_once(point).await else {
                    cancelled = true;
                    break 'sweep;
                };

                let step = next_step(result.passed, retries_left);
                if step == PointStep::Advance {
                    info!(
                        "PASS {} | mean {:.3} Mbps over {} samples | attempt {}",
                        point, result.mean_mbps, result.sample_count, attempts
                    );
                    reports.push(PointReport {
                        point,
                        attempts,
                        mean_mbps: result.mean_mbps,
                        outcome: PointOutcome::Passed,
                    });
                    state.finish_point();
                    self.plan.advance();
                    break;
                }

                warn!(
                    "FAIL {} | mean {:.3} Mbps over {} samples (floor {} Mbps)",
                    point, result.mean_mbps, result.sample_count, self.min_throughput_mbps
                );

                // The UE is presumed detached after any failed dwell, so
                // recovery runs even when no retry will follow.
                state.set_status(SweepStatus::Recovering);
                let recovery =
                    RecoveryPlan::for_point(point, &self.recovery_cfg, self.quietest_noise_db);
                let completed = recovery
                    .execute(&self.ctx, self.traffic.as_ref(), &self.cancel)
                    .await;
                if !completed {
                    cancelled = true;
                    break 'sweep;
                }
                state.set_status(SweepStatus::Running);

                if step == PointStep::RecoverAndRetry {
                    retries_left -= 1;
                    info!("Retrying {} ({} retries left)", point, retries_left);
                    continue;
                }

                warn!("Abandoning {} after {} attempts", point, attempts);
                reports.push(PointReport {
                    point,
                    attempts,
                    mean_mbps: result.mean_mbps,
                    outcome: PointOutcome::Abandoned,
                });
                state.finish_point();
                self.plan.advance();

                for skipped in self.plan.skip_remaining_in_pair(point.gain) {
                    warn!("Skipping {} (gain pair abandoned)", skipped);
                    reports.push(PointReport {
                        point: skipped,
                        attempts: 0,
                        mean_mbps: 0.0,
                        outcome: PointOutcome::Skipped,
                    });
                    state.finish_point();
                }
                break;
            }
        }

        if let Err(e) = self.traffic.stop().await {
            warn!("Traffic stop failed: {}", e);
        }

        if cancelled {
            state.set_status(SweepStatus::Cancelled);
            info!("Sweep cancelled: {}/{} points resolved", reports.len(), total);
        } else {
            state.set_status(SweepStatus::Complete);
            log_summary(&reports);
        }

        reports
    }

    /// One dwell attempt: command the point, hold, judge the window.
    ///
    /// Returns `None` when cancellation fired mid-dwell; the interrupted
    /// window is discarded rather than judged short.
    async fn dwell_once(&self, point: GridPoint) -> Option<DwellResult> {
        self.ctx.set_gain(point.gain).await;
        self.ctx.set_noise(point.noise_db).await;

        let window_start = Instant::now();
        tokio::select! {
            _ = self.cancel.cancelled() => return None,
            _ = tokio::time::sleep(self.dwell) => {}
        }

        let samples = self.buffer.samples_since(window_start);
        let mean = mean_mbps(&samples);
        Some(DwellResult {
            point,
            mean_mbps: mean,
            sample_count: samples.len(),
            passed: mean > self.min_throughput_mbps,
        })
    }
}

fn log_summary(reports: &[PointReport]) {
    let count = |outcome: PointOutcome| reports.iter().filter(|r| r.outcome == outcome).count();
    let passed = count(PointOutcome::Passed);
    let abandoned = count(PointOutcome::Abandoned);
    let skipped = count(PointOutcome::Skipped);

    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📊 SWEEP SUMMARY");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for report in reports {
        info!(
            "   {:<32} | {:>9.3} Mbps | {} attempt(s) | {}",
            report.point.to_string(),
            report.mean_mbps,
            report.attempts,
            report.outcome
        );
    }
    info!(
        "   Passed: {} | Abandoned: {} | Skipped: {}",
        passed, abandoned, skipped
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DwellConfig, GridConfig};
    use crate::control::{NoopTraffic, RecordingSink};
    use crate::sweep::SharedSweepState;
    use crate::types::{RateSample, RfCommand, UeKey};

    #[test]
    fn verdict_follows_pass_flag_and_retry_budget() {
        assert_eq!(next_step(true, 0), PointStep::Advance);
        assert_eq!(next_step(true, 3), PointStep::Advance);
        assert_eq!(next_step(false, 2), PointStep::RecoverAndRetry);
        assert_eq!(next_step(false, 1), PointStep::RecoverAndRetry);
        assert_eq!(next_step(false, 0), PointStep::RecoverAndAbandon);
    }

    fn bench_config(pairs: Vec<[f64; 2]>, noises: Vec<f64>, retries: u32) -> SweepConfig {
        SweepConfig {
            grid: GridConfig {
                gain_pairs_db: pairs,
                noise_levels_db: noises,
            },
            dwell: DwellConfig {
                dwell_secs: 1.0,
                min_throughput_mbps: 1.0,
                max_retries: retries,
            },
            recovery: RecoveryConfig {
                safe_gain_db: 80.0,
                ramp_step_db: 20.0,
                ramp_step_delay_secs: 0.01,
                settle_delay_secs: 0.01,
                stabilize_delay_secs: 0.01,
                net_stabilize_delay_secs: 0.01,
            },
            ..SweepConfig::default()
        }
    }

    /// Appends a constant-rate sample to the buffer every 100 ms, standing
    /// in for the ingest loop.
    fn spawn_feeder(buffer: SampleBuffer, mbps: f64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(100)).await;
                buffer.append(RateSample {
                    ue: UeKey::nr(1),
                    mbps,
                    observed_at: Instant::now(),
                });
            }
        })
    }

    fn build_controller(
        cfg: &SweepConfig,
        buffer: SampleBuffer,
        cancel: CancellationToken,
    ) -> (SweepController, Arc<RecordingSink>, SharedSweepState) {
        let sink = Arc::new(RecordingSink::new());
        let state = SharedSweepState::new();
        let ctx = SweepContext::new(sink.clone(), state.clone());
        let controller =
            SweepController::new(cfg, ctx, buffer, Arc::new(NoopTraffic), cancel);
        (controller, sink, state)
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_link_passes_every_point() {
        let cfg = bench_config(vec![[80.0, 80.0]], vec![-50.0, -30.0], 2);
        let buffer = SampleBuffer::default();
        let feeder = spawn_feeder(buffer.clone(), 5.0);
        let (controller, sink, state) = build_controller(&cfg, buffer, CancellationToken::new());

        let reports = controller.run().await;
        feeder.abort();

        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!(report.outcome, PointOutcome::Passed);
            assert_eq!(report.attempts, 1);
            assert!((report.mean_mbps - 5.0).abs() < 1e-9);
        }
        assert_eq!(state.snapshot().status, SweepStatus::Complete);
        assert_eq!(state.snapshot().points_done, 2);

        // Two commands per dwell, no recovery traffic.
        let commands = sink.sent();
        assert_eq!(commands.len(), 4);
        assert_eq!(
            commands[0],
            RfCommand::SetGain(crate::types::GainPair::uniform(80.0))
        );
        assert_eq!(commands[1], RfCommand::SetNoise(-50.0));
        assert_eq!(commands[3], RfCommand::SetNoise(-30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn mean_equal_to_the_floor_fails() {
        let cfg = bench_config(vec![[60.0, 60.0]], vec![-40.0], 0);
        let buffer = SampleBuffer::default();
        let feeder = spawn_feeder(buffer.clone(), 1.0);
        let (controller, _sink, _state) = build_controller(&cfg, buffer, CancellationToken::new());

        let reports = controller.run().await;
        feeder.abort();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, PointOutcome::Abandoned);
        assert_eq!(reports[0].attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandonment_skips_the_rest_of_the_pair_only() {
        let cfg = bench_config(
            vec![[70.0, 70.0], [50.0, 50.0]],
            vec![-50.0, -30.0, -10.0],
            0,
        );
        let buffer = SampleBuffer::default();
        // Nothing feeds the buffer: every dwell fails on an empty window.
        let (controller, _sink, state) = build_controller(&cfg, buffer, CancellationToken::new());

        let reports = controller.run().await;

        assert_eq!(reports.len(), 6);
        assert_eq!(reports[0].outcome, PointOutcome::Abandoned);
        assert_eq!(reports[1].outcome, PointOutcome::Skipped);
        assert_eq!(reports[2].outcome, PointOutcome::Skipped);
        // The second pair starts fresh rather than inheriting the skip.
        assert_eq!(reports[3].outcome, PointOutcome::Abandoned);
        assert_eq!(reports[3].point.gain, crate::types::GainPair::uniform(50.0));
        assert_eq!(reports[4].outcome, PointOutcome::Skipped);
        assert_eq!(reports[5].outcome, PointOutcome::Skipped);
        assert_eq!(state.snapshot().points_done, 6);
        assert_eq!(state.snapshot().status, SweepStatus::Complete);
    }
}
