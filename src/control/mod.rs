//! Radio command dispatch and downlink traffic generation.

mod sink;
mod traffic;

pub use sink::{CommandSink, NullSink, RecordingSink, SweepContext, TcpCommandSink};
pub use traffic::{IperfSsh, NoopTraffic, TrafficError, TrafficGenerator};
