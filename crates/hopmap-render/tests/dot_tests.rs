use hopmap_model::{GraphEdge, GraphNode, TopologyGraph};
use hopmap_render::{render, render_to_file, to_dot, OutputFormat, RenderError};
use std::fs;

fn node(id: &str, label: &str) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        label: label.to_string(),
    }
}

fn edge(from: &str, to: &str, elapsed_ms: f64) -> GraphEdge {
    GraphEdge {
        from: from.to_string(),
        to: to.to_string(),
        label: format!("{elapsed_ms:.1}ms"),
        elapsed_ms,
    }
}

fn sample_graph() -> TopologyGraph {
    TopologyGraph {
        version: 1,
        nodes: vec![node("gw", "gw\n(10.0.0.1)"), node("10.0.0.2", "10.0.0.2")],
        edges: vec![edge("gw", "10.0.0.2", 5.0), edge("gw", "10.0.0.2", 5.4)],
    }
}

#[test]
fn dot_lists_nodes_and_parallel_edges() {
    let dot = to_dot(&sample_graph()).unwrap();

    assert!(dot.starts_with("digraph hopmap {\n"));
    assert!(dot.ends_with("}\n"));
    assert!(dot.contains("  \"gw\" [label=\"gw\\n(10.0.0.1)\"];\n"));
    assert!(dot.contains("  \"10.0.0.2\" [label=\"10.0.0.2\"];\n"));
    assert!(dot.contains("  \"gw\" -> \"10.0.0.2\" [label=\"5.0ms\"];\n"));
    assert!(dot.contains("  \"gw\" -> \"10.0.0.2\" [label=\"5.4ms\"];\n"));
    assert_eq!(dot.matches("->").count(), 2);
}

#[test]
fn unsafe_graphs_are_rejected() {
    let mut empty_id = sample_graph();
    empty_id.nodes.push(node("", "nameless"));
    assert!(matches!(to_dot(&empty_id), Err(RenderError::InvalidGraph(_))));

    let mut bad_timing = sample_graph();
    bad_timing.edges.push(edge("gw", "10.0.0.2", f64::NAN));
    assert!(matches!(
        render(&bad_timing, OutputFormat::Dot),
        Err(RenderError::InvalidGraph(_))
    ));
}

#[test]
fn dot_file_is_written_atomically() {
    let dir = std::env::temp_dir().join(format!("hopmap-render-{}", std::process::id()));
    let path = dir.join("graph.dot");

    render_to_file(&sample_graph(), OutputFormat::Dot, &path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, to_dot(&sample_graph()).unwrap());
    let leftovers = fs::read_dir(&dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .map(|entry| entry.file_name().to_string_lossy().contains(".part-"))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(leftovers, 0);

    let _ = fs::remove_dir_all(&dir);
}
