//! Linksweep - wireless link performance-envelope characterization
//!
//! Sweeps a (gain-pair x noise) grid against a live RF bench, dwelling at
//! each point while measuring per-UE downlink throughput, and writes a CSV
//! of link records for offline analysis.
//!
//! # Usage
//!
//! ```bash
//! # Characterize a live bench (default: telemetry.addr from config)
//! ./linksweep --tcp 192.168.1.40:9001 -o envelope.csv
//!
//! # Replay captured snapshots from stdin (no radio, no commands)
//! cat snapshots.jsonl | ./linksweep --stdin
//!
//! # Closed-loop simulator, reproducible
//! ./linksweep --sim --seed 7
//! ```
//!
//! # Environment Variables
//!
//! - `LINKSWEEP_CONFIG`: Path to the sweep TOML (default: ./linksweep.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use linksweep::config;
use linksweep::control::{
    CommandSink, IperfSsh, NoopTraffic, NullSink, SweepContext, TcpCommandSink, TrafficGenerator,
};
use linksweep::record::CsvRecorder;
use linksweep::sweep::{SharedSweepState, SweepController};
use linksweep::telemetry::{
    IngestLoop, SampleBuffer, SimSource, SnapshotSource, StatsPoller, StdinSource, TcpSource,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "linksweep")]
#[command(about = "Wireless link performance-envelope characterization bench")]
#[command(version)]
struct CliArgs {
    /// Connect to the live stats endpoint, overriding telemetry.addr
    /// Example: ./linksweep --tcp 192.168.1.40:9001
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Read UE snapshots from stdin (JSON lines) instead of the live endpoint
    #[arg(long)]
    stdin: bool,

    /// Run against the built-in closed-loop link simulator (no radio needed)
    #[arg(long)]
    sim: bool,

    /// RNG seed for --sim runs; omit for entropy seeding
    #[arg(long)]
    seed: Option<u64>,

    /// Override the output CSV path
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Load sweep configuration from an explicit TOML file
    #[arg(long, value_name = "FILE")]
    config: Option<String>,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    StatsIngest,
    SweepController,
    StatsPoller,
    Recorder,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::StatsIngest => write!(f, "StatsIngest"),
            TaskName::SweepController => write!(f, "SweepController"),
            TaskName::StatsPoller => write!(f, "StatsPoller"),
            TaskName::Recorder => write!(f, "Recorder"),
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Run the supervisor loop: monitor tasks, cancel on failure.
///
/// After cancellation the remaining tasks are drained rather than dropped:
/// the recorder persists its rows on the way out, and dropping the JoinSet
/// would abort it mid-flush.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => {
                info!("🔒 Supervisor: Task {} completed normally", task_name);
            }
            Ok(Err(e)) => {
                error!("🔒 Supervisor: Task failed during shutdown: {}", e);
            }
            Err(e) => {
                error!("🔒 Supervisor: Task panicked during shutdown: {}", e);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Unified Bench Runner
// ============================================================================

/// Run the characterization bench with any snapshot source.
///
/// All input modes (TCP, stdin, simulator) flow through this function. The
/// sink and traffic generator carry the mode's command path (real radio
/// commands for TCP, no-ops otherwise); `poller` is the keep-alive request
/// task, present only when a live endpoint is attached.
async fn run_bench<S: SnapshotSource>(
    mut source: S,
    sink: Arc<dyn CommandSink>,
    traffic: Arc<dyn TrafficGenerator>,
    poller: Option<StatsPoller>,
    buffer: SampleBuffer,
    state: SharedSweepState,
    output_path: String,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🚀 Starting sweep pipeline ({} input)", source.source_name());
    info!("");

    let cfg = config::get();
    let ctx = SweepContext::new(sink, state.clone());
    let (record_tx, record_rx) = mpsc::channel(config::defaults::RECORD_CHANNEL_CAPACITY);
    let recorder = CsvRecorder::new(&output_path);

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: Stats ingest (snapshots -> rate tracker -> sample buffer)
    let ingest = IngestLoop::new(
        buffer.clone(),
        state.clone(),
        Some(record_tx),
        cancel_token.clone(),
    );
    task_set.spawn(async move {
        info!("[StatsIngest] Task starting");
        let stats = ingest.run(&mut source).await;
        info!(
            "[StatsIngest] Finished: {} snapshots, {} records",
            stats.snapshots, stats.records
        );
        Ok(TaskName::StatsIngest)
    });

    // Task 2: Sweep controller. Finishing the grid ends the run: cancel the
    // token so ingest and the recorder wind down and the CSV gets written.
    let controller = SweepController::new(cfg, ctx, buffer, traffic, cancel_token.clone());
    let sweep_cancel = cancel_token.clone();
    task_set.spawn(async move {
        info!("[SweepController] Task starting");
        let reports = controller.run().await;
        info!("[SweepController] Finished: {} points reported", reports.len());
        sweep_cancel.cancel();
        Ok(TaskName::SweepController)
    });

    // Task 3: Keep-alive poller (live endpoint only)
    if let Some(poller) = poller {
        task_set.spawn(async move {
            info!("[StatsPoller] Task starting");
            poller.run().await;
            Ok(TaskName::StatsPoller)
        });
    }

    // Task 4: CSV recorder
    let recorder_cancel = cancel_token.clone();
    task_set.spawn(async move {
        info!("[Recorder] Task starting");
        let rows = recorder.run(record_rx, recorder_cancel).await;
        info!("[Recorder] Finished: {} rows persisted", rows);
        Ok(TaskName::Recorder)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load sweep configuration (validated on load)
    let sweep_config = match &args.config {
        Some(path) => config::SweepConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => config::SweepConfig::load(),
    };
    info!(
        "Grid: {} gain pairs x {} noise levels | Dwell: {:.1}s | Retries: {}",
        sweep_config.grid.gain_pairs_db.len(),
        sweep_config.grid.noise_levels_db.len(),
        sweep_config.dwell.dwell_secs,
        sweep_config.dwell.max_retries,
    );
    config::init(sweep_config);
    let cfg = config::get();

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| cfg.output.csv_path.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  LINKSWEEP - Wireless Link Performance Envelope");
    info!("  Gain/Noise Grid Characterization Bench");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!("📁 Output: {}", output_path);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Shared across all input modes
    let buffer = SampleBuffer::new();
    let state = SharedSweepState::new();

    // Dispatch with the appropriate source, command sink, and traffic generator
    if args.sim {
        // --- Simulator mode ---
        info!("📥 Input: closed-loop link simulator");
        if let Some(seed) = args.seed {
            info!("   Seed: {}", seed);
        }
        let source = SimSource::new(state.clone(), cfg.telemetry.poll_interval(), args.seed);
        run_bench(
            source,
            Arc::new(NullSink),
            Arc::new(NoopTraffic),
            None,
            buffer,
            state,
            output_path,
            cancel_token,
        )
        .await?;
    } else if args.stdin {
        // --- Stdin mode ---
        info!("📥 Input: stdin (JSON snapshots)");
        run_bench(
            StdinSource::new(),
            Arc::new(NullSink),
            Arc::new(NoopTraffic),
            None,
            buffer,
            state,
            output_path,
            cancel_token,
        )
        .await?;
    } else {
        // --- TCP mode (default) ---
        let addr = args
            .tcp
            .clone()
            .unwrap_or_else(|| cfg.telemetry.addr.clone());
        let parts: Vec<&str> = addr.split(':').collect();
        if parts.len() != 2 {
            return Err(anyhow::anyhow!(
                "Invalid stats endpoint address. Expected HOST:PORT"
            ));
        }
        let port: u16 = parts[1].parse().context("Invalid port number")?;
        let host = parts[0];

        info!("📥 Input: live stats endpoint at {}", addr);
        let source = TcpSource::connect(
            host,
            port,
            cfg.telemetry.read_timeout_secs,
            cfg.telemetry.connect_timeout_secs,
        )
        .await?;
        let requester = source.requester();

        match &cfg.traffic.ssh_host {
            Some(ssh_host) => info!(
                "🚦 Traffic: iperf client on {}@{} -> {}",
                cfg.traffic.ssh_user, ssh_host, cfg.traffic.iperf_server
            ),
            None => info!("🚦 Traffic: disabled (no ssh_host configured)"),
        }
        let traffic: Arc<dyn TrafficGenerator> = match IperfSsh::from_config(&cfg.traffic) {
            Some(iperf) => Arc::new(iperf),
            None => Arc::new(NoopTraffic),
        };

        let sink: Arc<dyn CommandSink> = Arc::new(TcpCommandSink::new(requester.clone()));
        let poller = StatsPoller::new(
            requester,
            cfg.telemetry.poll_interval(),
            cancel_token.clone(),
        );

        run_bench(
            source,
            sink,
            traffic,
            Some(poller),
            buffer,
            state,
            output_path,
            cancel_token,
        )
        .await?;
    }

    info!("");
    info!("✓ Linksweep shutdown complete");
    Ok(())
}
