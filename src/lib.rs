//! Linksweep: wireless link performance-envelope characterization
//!
//! Drives an SDR test bench through a grid of (gain pair x injected noise)
//! operating points, measuring per-UE downlink throughput at each one and
//! recovering the link whenever a point kills it.
//!
//! ## Architecture
//!
//! - **Telemetry**: stats polling, snapshot ingest, per-UE rate derivation
//! - **Sweep**: grid traversal, dwell judgement, link recovery
//! - **Control**: RF command dispatch and iperf traffic generation
//! - **Record**: CSV persistence of every observed rate sample

pub mod config;
pub mod control;
pub mod record;
pub mod sweep;
pub mod telemetry;
pub mod types;

// Re-export sweep configuration
pub use config::SweepConfig;

// Re-export commonly used types
pub use types::{
    GainPair, GridPoint, LinkRecord, PointOutcome, PointReport, RfCommand, SweepStatus, UeKey,
    UeSnapshot,
};

// Re-export the engine pieces main() wires together
pub use control::{CommandSink, SweepContext, TrafficGenerator};
pub use record::CsvRecorder;
pub use sweep::{SharedSweepState, SweepController};
pub use telemetry::{IngestLoop, SampleBuffer, SnapshotSource, StatsPoller};
