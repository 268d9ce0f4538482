use crate::error::RenderError;
use hopmap_model::TopologyGraph;
use std::fmt::Write;

/// Checks that every node has an id and every edge a usable timing.
pub fn validate(graph: &TopologyGraph) -> Result<(), RenderError> {
    if let Some(index) = graph.nodes.iter().position(|node| node.id.is_empty()) {
        return Err(RenderError::InvalidGraph(format!("node {index} has an empty id")));
    }

    for edge in &graph.edges {
        if !edge.elapsed_ms.is_finite() || edge.elapsed_ms < 0.0 {
            return Err(RenderError::InvalidGraph(format!(
                "edge {} -> {} has timing {}",
                edge.from, edge.to, edge.elapsed_ms
            )));
        }
    }

    Ok(())
}

pub fn to_dot(graph: &TopologyGraph) -> Result<String, RenderError> {
    validate(graph)?;

    let mut out = String::from("digraph hopmap {\n");
    // writing into a String cannot fail
    for node in &graph.nodes {
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\"];",
            escape(&node.id),
            escape(&node.label)
        );
    }
    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(&edge.from),
            escape(&edge.to),
            escape(&edge.label)
        );
    }
    out.push_str("}\n");

    Ok(out)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
