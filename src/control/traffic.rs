//! Downlink traffic generation over SSH.
//!
//! The UE-side host runs `iperf` against the core network so the sweep has
//! offered load to measure. Starting and stopping that flow is abstracted
//! behind [`TrafficGenerator`] so replay and simulation modes can run
//! without an SSH session.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::TrafficConfig;

/// Delay after spawning before the flow is considered started.
const SPAWN_SETTLE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("Failed to spawn ssh process: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for traffic generator backends.
///
/// Implementations must be thread-safe (Send + Sync); the controller and
/// the recovery procedure share one generator across tasks, so `start` and
/// `stop` take `&self`.
#[async_trait]
pub trait TrafficGenerator: Send + Sync {
    /// Start the downlink flow. Starting an already-running flow is a no-op.
    async fn start(&self) -> Result<(), TrafficError>;

    /// Stop the flow. Stopping an already-stopped flow is a no-op.
    async fn stop(&self) -> Result<(), TrafficError>;

    /// Get the generator name for logging
    fn generator_name(&self) -> &'static str;
}

/// Runs `iperf` on a remote host through `ssh`.
///
/// The forced TTY (`-t -t`) ties the remote iperf to the ssh process, so
/// killing ssh delivers the hangup that stops iperf on the far side.
pub struct IperfSsh {
    ssh_user: String,
    ssh_host: String,
    server: String,
    bandwidth: String,
    duration_secs: u64,
    child: Mutex<Option<Child>>,
}

impl IperfSsh {
    #[must_use]
    pub fn new(
        ssh_user: &str,
        ssh_host: &str,
        server: &str,
        bandwidth: &str,
        duration_secs: u64,
    ) -> Self {
        Self {
            ssh_user: ssh_user.to_string(),
            ssh_host: ssh_host.to_string(),
            server: server.to_string(),
            bandwidth: bandwidth.to_string(),
            duration_secs,
            child: Mutex::new(None),
        }
    }

    /// Builds a generator from config, or `None` when no SSH host is set.
    #[must_use]
    pub fn from_config(cfg: &TrafficConfig) -> Option<Self> {
        let host = cfg.ssh_host.as_deref()?;
        Some(Self::new(
            &cfg.ssh_user,
            host,
            &cfg.iperf_server,
            &cfg.iperf_bandwidth,
            cfg.iperf_duration_secs,
        ))
    }
}

#[async_trait]
impl TrafficGenerator for IperfSsh {
    async fn start(&self) -> Result<(), TrafficError> {
        let mut guard = self.child.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let target = format!("{}@{}", self.ssh_user, self.ssh_host);
        info!(target = %target, server = %self.server, "Starting iperf over ssh");

        let child = Command::new("ssh")
            .arg("-t")
            .arg("-t")
            .arg(&target)
            .arg("iperf")
            .arg("-c")
            .arg(&self.server)
            .arg("-u")
            .arg("-b")
            .arg(&self.bandwidth)
            .arg("-t")
            .arg(self.duration_secs.to_string())
            .arg("-i")
            .arg("1")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TrafficError::SpawnFailed(format!("'ssh {}': {}. Is ssh installed?", target, e))
            })?;

        *guard = Some(child);
        drop(guard);

        tokio::time::sleep(SPAWN_SETTLE).await;
        info!("iperf command sent");
        Ok(())
    }

    async fn stop(&self) -> Result<(), TrafficError> {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            info!("Stopping iperf");
            if let Err(e) = child.kill().await {
                warn!("Error stopping iperf: {}", e);
            }
        }
        Ok(())
    }

    fn generator_name(&self) -> &'static str {
        "iperf-ssh"
    }
}

/// Generator that drives nothing.
///
/// Used in replay and simulation modes, and on live runs started without
/// SSH credentials where an operator runs iperf by hand.
pub struct NoopTraffic;

#[async_trait]
impl TrafficGenerator for NoopTraffic {
    async fn start(&self) -> Result<(), TrafficError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), TrafficError> {
        Ok(())
    }

    fn generator_name(&self) -> &'static str {
        "noop"
    }
}
