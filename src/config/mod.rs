//! Sweep Configuration Module
//!
//! Per-run configuration loaded from TOML files, replacing the hardcoded
//! bench constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `LINKSWEEP_CONFIG` environment variable (path to TOML file)
//! 2. `linksweep.toml` in the current working directory
//! 3. Built-in defaults (matching the original bench constants)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(SweepConfig::load());
//!
//! // Anywhere in the codebase:
//! let dwell = config::get().dwell.dwell_secs;
//! ```

mod sweep_config;
pub mod defaults;

pub use sweep_config::*;

use std::sync::OnceLock;

/// Global sweep configuration, initialized once at startup.
static SWEEP_CONFIG: OnceLock<SweepConfig> = OnceLock::new();

/// Initialize the global sweep configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: SweepConfig) {
    if SWEEP_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once - ignoring");
    }
}

/// Get a reference to the global sweep configuration.
///
/// Panics if `init()` has not been called; a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static SweepConfig {
    SWEEP_CONFIG
        .get()
        .expect("config::get() called before config::init() - this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    SWEEP_CONFIG.get().is_some()
}
