//! Shared data structures for the link characterization pipeline
//!
//! Three groups:
//! - `snapshot`: serde model of the inbound UE telemetry JSON,
//! - `sweep`: grid coordinates, RF commands, samples, and point outcomes,
//! - `record`: the stamped per-UE CSV row.

mod record;
mod snapshot;
mod sweep;

pub use record::*;
pub use snapshot::*;
pub use sweep::*;
