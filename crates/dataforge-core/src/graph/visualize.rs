use petgraph::visit::EdgeRef;

use crate::graph::cycle::BrokenEdge;
use crate::graph::dag::{DependencyGraph, Relations};

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the fill-order graph. Arrows point from the table filled first to
/// the table that references it; edges broken to resolve a cycle are dashed.
pub fn visualize(relations: &Relations, broken_edges: &[BrokenEdge], format: GraphFormat) -> String {
    let is_broken = |from: &str, to: &str| {
        broken_edges
            .iter()
            .any(|e| e.referenced == from && e.referencing == to)
    };
    let graph = DependencyGraph::build(relations, is_broken);

    match format {
        GraphFormat::Mermaid => generate_mermaid(&graph, broken_edges),
        GraphFormat::Dot => generate_dot(&graph, broken_edges),
    }
}

fn generate_mermaid(graph: &DependencyGraph, broken_edges: &[BrokenEdge]) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!("    {}[{}]\n", mermaid_id(name), name));
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = edge.weight().columns.join(", ");
        output.push_str(&format!(
            "    {} -->|{}| {}\n",
            mermaid_id(from),
            label,
            mermaid_id(to)
        ));
    }

    for broken in broken_edges {
        output.push_str(&format!(
            "    {} -.->|{} (broken)| {}\n",
            mermaid_id(&broken.referenced),
            broken.columns.join(", "),
            mermaid_id(&broken.referencing)
        ));
    }

    if !broken_edges.is_empty() {
        output.push_str("\n    %% Dashed edges were dropped to break a dependency cycle\n");
    }

    output
}

fn generate_dot(graph: &DependencyGraph, broken_edges: &[BrokenEdge]) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    // Isolated tables only show up if listed explicitly
    for node in graph.graph.node_indices() {
        output.push_str(&format!("    \"{}\";\n", graph.table_name(node)));
    }
    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = edge.weight().columns.join(", ");
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
            from, to, label
        ));
    }

    for broken in broken_edges {
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{} (broken)\", style=dashed, color=red];\n",
            broken.referenced,
            broken.referencing,
            broken.columns.join(", ")
        ));
    }

    output.push_str("}\n");
    output
}

/// Mermaid node ids may not contain spaces or punctuation.
fn mermaid_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relations() -> Relations {
        let mut relations = Relations::default();
        relations
            .depends_on
            .entry("users".to_string())
            .or_default()
            .insert("teams".to_string(), vec!["team_id".to_string()]);
        relations
            .depends_on
            .entry("teams".to_string())
            .or_default()
            .insert("users".to_string(), vec!["owner_id".to_string()]);
        relations
    }

    #[test]
    fn test_mermaid_output() {
        let broken = vec![BrokenEdge {
            referenced: "users".to_string(),
            referencing: "teams".to_string(),
            columns: vec!["owner_id".to_string()],
        }];
        let output = visualize(&relations(), &broken, GraphFormat::Mermaid);

        assert!(output.starts_with("graph TD"));
        assert!(output.contains("teams -->|team_id| users"));
        assert!(output.contains("users -.->|owner_id (broken)| teams"));
        // The broken edge is not drawn solid as well
        assert!(!output.contains("users -->|owner_id| teams"));
    }

    #[test]
    fn test_dot_output() {
        let output = visualize(&relations(), &[], GraphFormat::Dot);
        assert!(output.contains("\"teams\" -> \"users\" [label=\"team_id\"];"));
        assert!(output.contains("\"users\" -> \"teams\" [label=\"owner_id\"];"));
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn test_mermaid_id_sanitized() {
        assert_eq!(mermaid_id("order items"), "order_items");
    }
}
