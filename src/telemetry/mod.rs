//! UE stats acquisition and rate derivation.
//!
//! ```text
//! StatsPoller ──ue_get──> endpoint ──JSON──> SnapshotSource
//!                                                │
//!                                          IngestLoop
//!                                          │        │
//!                                    SampleBuffer  LinkRecord channel
//!                                    (controller)  (CSV recorder)
//! ```
//!
//! Every input mode (live TCP, stdin replay, simulation) feeds the same
//! [`IngestLoop`], which turns cumulative byte counters into per-UE average
//! rates.

mod buffer;
mod ingest;
mod poller;
mod rate;
pub mod client;
pub mod sim;
pub mod source;

pub use buffer::{mean_mbps, SampleBuffer};
pub use client::{StatsClient, TelemetryError, TelemetryRequester};
pub use ingest::{IngestLoop, IngestStats};
pub use poller::StatsPoller;
pub use rate::RateTracker;
pub use sim::SimSource;
pub use source::{ReplaySource, SnapshotEvent, SnapshotSource, StdinSource, TcpSource};
