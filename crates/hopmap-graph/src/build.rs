use hopmap_model::{format_elapsed, GraphEdge, GraphNode, HopEvent, Round, TopologyGraph};
use std::collections::HashSet;

/// Accumulates rounds, possibly from several hosts, into one graph.
///
/// Nodes are keyed by hop identity, so a responder seen in many rounds is a
/// single node. Edges are never merged: each round adds its own.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: TopologyGraph,
    seen: HashSet<String>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: TopologyGraph {
                version: 1,
                ..TopologyGraph::default()
            },
            seen: HashSet::new(),
        }
    }

    /// Links consecutive replies of `round`. Timeouts add nothing and do not
    /// break the path: the next reply links back to the last one seen.
    pub fn add_round(&mut self, round: &Round) {
        let mut prev: Option<String> = None;

        for hop in round.successes() {
            let id = self.node_for(hop);
            if let Some(from) = prev.take() {
                self.graph.edges.push(GraphEdge {
                    from,
                    to: id.clone(),
                    label: format_elapsed(hop.elapsed),
                    elapsed_ms: hop.elapsed_ms(),
                });
            }
            prev = Some(id);
        }
    }

    pub fn add_rounds<'a, I>(&mut self, rounds: I)
    where
        I: IntoIterator<Item = &'a Round>,
    {
        for round in rounds {
            self.add_round(round);
        }
    }

    pub fn finish(self) -> TopologyGraph {
        self.graph
    }

    fn node_for(&mut self, hop: &HopEvent) -> String {
        let id = hop.identity();
        if self.seen.insert(id.clone()) {
            self.graph.nodes.push(GraphNode {
                id: id.clone(),
                label: hop.node_label(),
            });
        }
        id
    }
}

pub fn build_graph<'a, I>(rounds: I) -> TopologyGraph
where
    I: IntoIterator<Item = &'a Round>,
{
    let mut builder = GraphBuilder::new();
    builder.add_rounds(rounds);
    builder.finish()
}
