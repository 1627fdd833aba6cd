//! System-wide default constants.
//!
//! Centralises the sweep's magic numbers. Grouped by subsystem for easy
//! discovery; the config structs in `sweep_config` build their `Default`
//! impls from these.

// ============================================================================
// Grid
// ============================================================================

/// Default gain grid (dB), applied identically to both axes, descending.
pub const DEFAULT_GAIN_GRID_DB: [f64; 8] = [90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0];

/// Default injected-noise grid (dB), quietest first.
pub const DEFAULT_NOISE_GRID_DB: [f64; 6] = [-50.0, -40.0, -30.0, -20.0, -10.0, 0.0];

// ============================================================================
// Dwell & Evaluation
// ============================================================================

/// Hold time at each grid point while samples accumulate (seconds).
pub const DEFAULT_DWELL_SECS: f64 = 10.0;

/// Mean downlink throughput a dwell must exceed (strictly) to pass (Mbps).
pub const DEFAULT_MIN_THROUGHPUT_MBPS: f64 = 1.0;

/// Recovery retries per grid point after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

// ============================================================================
// Recovery
// ============================================================================

/// Gain known to sustain a connection on both axes (dB).
pub const DEFAULT_SAFE_GAIN_DB: f64 = 80.0;

/// Per-step decrement when ramping gain from safe back to target (dB).
pub const DEFAULT_RAMP_STEP_DB: f64 = 5.0;

/// Pause between ramp steps (seconds).
pub const DEFAULT_RAMP_STEP_DELAY_SECS: f64 = 2.0;

/// Pause after stopping traffic, before commanding the safe state (seconds).
pub const DEFAULT_SETTLE_DELAY_SECS: f64 = 3.0;

/// Hold at the safe state so the UE can re-attach (seconds).
pub const DEFAULT_STABILIZE_DELAY_SECS: f64 = 30.0;

/// Hold after restarting traffic before the next dwell (seconds).
pub const DEFAULT_NET_STABILIZE_DELAY_SECS: f64 = 10.0;

// ============================================================================
// Telemetry
// ============================================================================

/// Default stats endpoint for `--tcp` runs.
pub const DEFAULT_TELEMETRY_ADDR: &str = "127.0.0.1:9001";

/// Keep-alive cadence for re-issuing the `ue_get` stats request (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;

/// Per-read timeout on the telemetry connection (seconds). Snapshots arrive
/// once per poll interval, so anything beyond this means a dead link.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Connect timeout for the telemetry endpoint (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Traffic
// ============================================================================

/// Downlink iperf server the remote host streams against.
pub const DEFAULT_IPERF_SERVER: &str = "192.168.2.2";

/// UDP bandwidth passed to iperf `-b`.
pub const DEFAULT_IPERF_BANDWIDTH: &str = "230m";

/// iperf run length (`-t`, seconds); long enough to outlive any dwell.
pub const DEFAULT_IPERF_DURATION_SECS: u64 = 1000;

/// Default SSH user on the traffic host.
pub const DEFAULT_SSH_USER: &str = "sdr";

// ============================================================================
// Recorder
// ============================================================================

/// Default CSV output path.
pub const DEFAULT_OUTPUT_FILE: &str = "ue_monitor_log.csv";

/// Bounded channel between ingest and the recorder task. Sized for minutes
/// of backlog at one snapshot per second with a handful of UEs.
pub const RECORD_CHANNEL_CAPACITY: usize = 4096;
