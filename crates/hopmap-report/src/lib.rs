//! Hop aggregation across rounds and the text report.

pub mod aggregate;
pub mod format;

pub use aggregate::{aggregate, Aggregated, Cluster, Responder};
pub use format::{format_hop, format_report};
