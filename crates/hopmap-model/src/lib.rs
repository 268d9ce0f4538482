//! Shared data structures for hopmap.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Milliseconds with one decimal, as shown in reports and on graph edges.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}ms", elapsed.as_micros() as f64 / 1000.0)
}

/// One reported response, or timeout, for a single distance of a single round.
///
/// `address`, `host_name` and `elapsed` only carry meaning when `success` is
/// true; a timeout uses the unspecified address and a zero duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HopEvent {
    pub distance: u32,
    pub address: Ipv4Addr,
    pub host_name: String,
    pub success: bool,
    pub elapsed: Duration,
}

impl HopEvent {
    pub fn reply(distance: u32, address: Ipv4Addr, host_name: &str, elapsed: Duration) -> Self {
        Self {
            distance,
            address,
            host_name: host_name.to_string(),
            success: true,
            elapsed,
        }
    }

    pub fn timeout(distance: u32) -> Self {
        Self {
            distance,
            address: Ipv4Addr::UNSPECIFIED,
            host_name: String::new(),
            success: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn address_text(&self) -> String {
        self.address.to_string()
    }

    /// Resolved name when present, otherwise the dotted address. Hops sharing
    /// an identity are the same node in the topology graph.
    pub fn identity(&self) -> String {
        if self.host_name.is_empty() {
            self.address_text()
        } else {
            self.host_name.clone()
        }
    }

    pub fn node_label(&self) -> String {
        if self.host_name.is_empty() {
            self.address_text()
        } else {
            format!("{}\n({})", self.host_name, self.address)
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_micros() as f64 / 1000.0
    }
}

/// Hop events of one probe attempt against one host, in arrival order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Round {
    pub events: Vec<HopEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Round {
    pub fn new(events: Vec<HopEvent>) -> Self {
        Self {
            events,
            error: None,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &HopEvent> {
        self.events.iter().filter(|event| event.success)
    }
}

/// All rounds issued against one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostTrace {
    pub target: String,
    pub address: Ipv4Addr,
    pub started_at_utc: String,
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceFile {
    pub version: u32,
    pub hosts: Vec<HostTrace>,
}

impl TraceFile {
    pub fn new(hosts: Vec<HostTrace>) -> Self {
        Self { version: 1, hosts }
    }

    pub fn rounds(&self) -> impl Iterator<Item = &Round> {
        self.hosts.iter().flat_map(|host| host.rounds.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologyGraph {
    pub version: u32,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub elapsed_ms: f64,
}
