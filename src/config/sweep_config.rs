//! Sweep configuration - every tunable of a characterization run as
//! operator-editable TOML
//!
//! Each struct implements `Default` with values matching the constants in
//! [`super::defaults`], so a missing config file reproduces the stock
//! lab-bench run exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::GainPair;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a characterization run.
///
/// Load with `SweepConfig::load()` which searches:
/// 1. `$LINKSWEEP_CONFIG` env var
/// 2. `./linksweep.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    /// The (gain-pair x noise) grid to visit
    #[serde(default)]
    pub grid: GridConfig,

    /// Dwell timing and pass/fail judgement
    #[serde(default)]
    pub dwell: DwellConfig,

    /// Recovery sequencing after a failed dwell
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Telemetry connection tuning
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Remote traffic generator (iperf over SSH)
    #[serde(default)]
    pub traffic: TrafficConfig,

    /// Record persistence
    #[serde(default)]
    pub output: OutputConfig,
}

impl SweepConfig {
    /// Load configuration using the standard search order:
    /// 1. `$LINKSWEEP_CONFIG` environment variable
    /// 2. `./linksweep.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("LINKSWEEP_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded sweep config from LINKSWEEP_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from LINKSWEEP_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "LINKSWEEP_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("linksweep.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded sweep config from ./linksweep.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./linksweep.toml, using defaults");
                }
            }
        }

        info!("No linksweep.toml found - using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency. Collects every problem rather than
    /// stopping at the first so the operator can fix a file in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.grid.gain_pairs_db.is_empty() {
            errors.push("grid.gain_pairs_db must list at least one [lte, nr] pair".to_string());
        }
        if self.grid.noise_levels_db.is_empty() {
            errors.push("grid.noise_levels_db must list at least one level".to_string());
        }
        if self.dwell.dwell_secs <= 0.0 {
            errors.push(format!(
                "dwell.dwell_secs must be positive (got {})",
                self.dwell.dwell_secs
            ));
        }
        if self.dwell.min_throughput_mbps < 0.0 {
            errors.push(format!(
                "dwell.min_throughput_mbps must not be negative (got {})",
                self.dwell.min_throughput_mbps
            ));
        }
        if self.recovery.ramp_step_db <= 0.0 {
            errors.push(format!(
                "recovery.ramp_step_db must be positive (got {})",
                self.recovery.ramp_step_db
            ));
        }
        if self.recovery.safe_gain_db < 0.0 {
            errors.push(format!(
                "recovery.safe_gain_db must not be negative (got {})",
                self.recovery.safe_gain_db
            ));
        }
        if self.telemetry.poll_interval_secs <= 0.0 {
            errors.push(format!(
                "telemetry.poll_interval_secs must be positive (got {})",
                self.telemetry.poll_interval_secs
            ));
        }
        if self.telemetry.addr.is_empty() {
            errors.push("telemetry.addr must not be empty".to_string());
        }
        if let Some(host) = &self.traffic.ssh_host {
            if host.is_empty() {
                errors.push("traffic.ssh_host must not be empty when set".to_string());
            }
        }
        if self.output.csv_path.is_empty() {
            errors.push("output.csv_path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// The coordinate grid. Order matters on both axes: it is the visit order,
/// and abandonment skips the remaining noise levels of the current pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Ordered `[lte, nr]` gain pairs (dB) - the outer sweep axis.
    #[serde(default = "default_gain_pairs_db")]
    pub gain_pairs_db: Vec<[f64; 2]>,
    /// Ordered injected-noise levels (dB) - the inner sweep axis.
    #[serde(default = "default_noise_levels_db")]
    pub noise_levels_db: Vec<f64>,
}

impl GridConfig {
    /// Gain pairs as typed values, preserving order.
    #[must_use]
    pub fn gain_pairs(&self) -> Vec<GainPair> {
        self.gain_pairs_db
            .iter()
            .map(|&[lte, nr]| GainPair::new(lte, nr))
            .collect()
    }

    /// The quietest configured noise level - recovery's known-good floor.
    #[must_use]
    pub fn quietest_noise_db(&self) -> f64 {
        self.noise_levels_db
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            gain_pairs_db: default_gain_pairs_db(),
            noise_levels_db: default_noise_levels_db(),
        }
    }
}

/// Dwell timing and the pass threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DwellConfig {
    /// Hold time at each grid point (seconds).
    #[serde(default = "default_dwell_secs")]
    pub dwell_secs: f64,
    /// A dwell passes when its mean rate strictly exceeds this (Mbps).
    #[serde(default = "default_min_throughput_mbps")]
    pub min_throughput_mbps: f64,
    /// Recovery retries per grid point after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl DwellConfig {
    #[must_use]
    pub fn dwell(&self) -> Duration {
        Duration::from_secs_f64(self.dwell_secs)
    }
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            dwell_secs: default_dwell_secs(),
            min_throughput_mbps: default_min_throughput_mbps(),
            max_retries: default_max_retries(),
        }
    }
}

/// Recovery sequencing. All waits are fixed durations, not adaptive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Gain known to sustain a connection on both axes (dB).
    #[serde(default = "default_safe_gain_db")]
    pub safe_gain_db: f64,
    /// Per-step decrement when ramping from safe gain to target (dB).
    #[serde(default = "default_ramp_step_db")]
    pub ramp_step_db: f64,
    /// Pause between ramp steps (seconds).
    #[serde(default = "default_ramp_step_delay_secs")]
    pub ramp_step_delay_secs: f64,
    /// Pause after stopping traffic (seconds).
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: f64,
    /// Hold at the safe state so the UE can re-attach (seconds).
    #[serde(default = "default_stabilize_delay_secs")]
    pub stabilize_delay_secs: f64,
    /// Hold after restarting traffic before the next dwell (seconds).
    #[serde(default = "default_net_stabilize_delay_secs")]
    pub net_stabilize_delay_secs: f64,
}

impl RecoveryConfig {
    #[must_use]
    pub fn ramp_step_delay(&self) -> Duration {
        Duration::from_secs_f64(self.ramp_step_delay_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.settle_delay_secs)
    }

    #[must_use]
    pub fn stabilize_delay(&self) -> Duration {
        Duration::from_secs_f64(self.stabilize_delay_secs)
    }

    #[must_use]
    pub fn net_stabilize_delay(&self) -> Duration {
        Duration::from_secs_f64(self.net_stabilize_delay_secs)
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            safe_gain_db: default_safe_gain_db(),
            ramp_step_db: default_ramp_step_db(),
            ramp_step_delay_secs: default_ramp_step_delay_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            stabilize_delay_secs: default_stabilize_delay_secs(),
            net_stabilize_delay_secs: default_net_stabilize_delay_secs(),
        }
    }
}

/// Telemetry connection tuning for `--tcp` runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Stats endpoint as `HOST:PORT`. Overridable with `--tcp`.
    #[serde(default = "default_telemetry_addr")]
    pub addr: String,
    /// Keep-alive cadence for the `ue_get` stats request (seconds).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,
    /// Per-read timeout before the connection is considered dead (seconds).
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Connect timeout (seconds).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl TelemetryConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            addr: default_telemetry_addr(),
            poll_interval_secs: default_poll_interval_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Remote traffic generator. With no `ssh_host` the sweep runs without
/// driving traffic (useful against the simulator or a bench with its own
/// load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Host that runs the iperf client; `None` disables traffic control.
    #[serde(default)]
    pub ssh_host: Option<String>,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    /// Downlink iperf server address the remote host streams against.
    #[serde(default = "default_iperf_server")]
    pub iperf_server: String,
    /// UDP bandwidth for iperf `-b`.
    #[serde(default = "default_iperf_bandwidth")]
    pub iperf_bandwidth: String,
    /// iperf run length (`-t`, seconds).
    #[serde(default = "default_iperf_duration_secs")]
    pub iperf_duration_secs: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            ssh_host: None,
            ssh_user: default_ssh_user(),
            iperf_server: default_iperf_server(),
            iperf_bandwidth: default_iperf_bandwidth(),
            iperf_duration_secs: default_iperf_duration_secs(),
        }
    }
}

/// Record persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV path for the collected link records.
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

// ============================================================================
// Serde default helpers
// ============================================================================

fn default_gain_pairs_db() -> Vec<[f64; 2]> {
    defaults::DEFAULT_GAIN_GRID_DB.iter().map(|&g| [g, g]).collect()
}

fn default_noise_levels_db() -> Vec<f64> {
    defaults::DEFAULT_NOISE_GRID_DB.to_vec()
}

fn default_dwell_secs() -> f64 {
    defaults::DEFAULT_DWELL_SECS
}

fn default_min_throughput_mbps() -> f64 {
    defaults::DEFAULT_MIN_THROUGHPUT_MBPS
}

fn default_max_retries() -> u32 {
    defaults::DEFAULT_MAX_RETRIES
}

fn default_safe_gain_db() -> f64 {
    defaults::DEFAULT_SAFE_GAIN_DB
}

fn default_ramp_step_db() -> f64 {
    defaults::DEFAULT_RAMP_STEP_DB
}

fn default_ramp_step_delay_secs() -> f64 {
    defaults::DEFAULT_RAMP_STEP_DELAY_SECS
}

fn default_settle_delay_secs() -> f64 {
    defaults::DEFAULT_SETTLE_DELAY_SECS
}

fn default_stabilize_delay_secs() -> f64 {
    defaults::DEFAULT_STABILIZE_DELAY_SECS
}

fn default_net_stabilize_delay_secs() -> f64 {
    defaults::DEFAULT_NET_STABILIZE_DELAY_SECS
}

fn default_telemetry_addr() -> String {
    defaults::DEFAULT_TELEMETRY_ADDR.to_string()
}

fn default_poll_interval_secs() -> f64 {
    defaults::DEFAULT_POLL_INTERVAL_SECS
}

fn default_read_timeout_secs() -> u64 {
    defaults::DEFAULT_READ_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    defaults::DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_ssh_user() -> String {
    defaults::DEFAULT_SSH_USER.to_string()
}

fn default_iperf_server() -> String {
    defaults::DEFAULT_IPERF_SERVER.to_string()
}

fn default_iperf_bandwidth() -> String {
    defaults::DEFAULT_IPERF_BANDWIDTH.to_string()
}

fn default_iperf_duration_secs() -> u64 {
    defaults::DEFAULT_IPERF_DURATION_SECS
}

fn default_csv_path() -> String {
    defaults::DEFAULT_OUTPUT_FILE.to_string()
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration loading / validation errors
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
