//! Probe rounds, hop event collection and target orchestration.

pub mod collector;
pub mod conduit;
pub mod error;
pub mod parser;
pub mod prober;
pub mod session;

pub use collector::{collect, collect_with};
pub use conduit::{hop_conduit, HopReceiver, HopSender};
pub use error::TraceError;
pub use parser::parse_hop_line;
pub use prober::{resolve_ipv4, ProbeOptions, Prober, SystemTraceroute};
pub use session::{trace_host, trace_hosts, TraceSettings};
