//! Topology graph building.

pub mod build;

pub use build::{build_graph, GraphBuilder};
