use rag_core::{RetrievedNode, TraversedEdge};

pub const CONTEXT_HEADER: &str = "=== Relevant Medical Q&A Information ===\n";

/// Renders retrieved nodes and edges as the LLM context block.
///
/// Only the first `max_nodes` nodes and `max_edges` edges are rendered; the
/// edge section header still reports the full edge count. No nodes renders
/// as the empty string.
pub fn render_context(
    nodes: &[RetrievedNode],
    edges: &[TraversedEdge],
    max_nodes: usize,
    max_edges: usize
) -> String {
    if nodes.is_empty() {
        return String::new();
    }

    let mut parts = vec![CONTEXT_HEADER.to_string()];
    for (position, node) in nodes.iter().take(max_nodes).enumerate() {
        parts.push(format!("[{}] Question: {}", position + 1, node.record.question));
        parts.push(format!("    Answer: {}", node.record.answer));
        if node.similarity > 0.0 {
            parts.push(format!("    Relevance: {:.3}", node.similarity));
        }
        parts.push(String::new());
    }

    if !edges.is_empty() {
        parts.push(format!(
            "\n=== Related Medical Concepts (Graph Connections: {}) ===",
            edges.len()
        ));
        for edge in edges.iter().take(max_edges) {
            parts.push(format!("Related: {} -> {}", edge.source_id, edge.target_id));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::QaRecord;

    fn edge(source: &str, target: &str) -> TraversedEdge {
        TraversedEdge {
            source_id: source.to_string(),
            target_id: target.to_string()
        }
    }

    #[test]
    fn test_empty_nodes_render_empty() {
        assert_eq!(render_context(&[], &[edge("a", "b")], 10, 5), "");
    }

    #[test]
    fn test_seed_and_traversal_nodes() {
        let nodes = vec![
            RetrievedNode::seed(QaRecord::new("a", "What is fever?", "A high temperature."), 0.91234),
            RetrievedNode::traversal(QaRecord::new("b", "Fever in kids?", "Common."), 1)
        ];
        let context = render_context(&nodes, &[edge("a", "b")], 10, 5);

        let expected = "=== Relevant Medical Q&A Information ===\n\n\
                        [1] Question: What is fever?\n    Answer: A high temperature.\n    Relevance: 0.912\n\n\
                        [2] Question: Fever in kids?\n    Answer: Common.\n\n\n\
                        === Related Medical Concepts (Graph Connections: 1) ===\n\
                        Related: a -> b";
        assert_eq!(context, expected);
    }

    #[test]
    fn test_caps_nodes_and_edges() {
        let nodes: Vec<RetrievedNode> = (0..15)
            .map(|i| RetrievedNode::seed(QaRecord::new(format!("n{i}"), format!("q{i}"), "a"), 0.5))
            .collect();
        let edges: Vec<TraversedEdge> = (0..8).map(|i| edge("n0", &format!("n{i}"))).collect();

        let context = render_context(&nodes, &edges, 10, 5);
        assert!(context.contains("[10] Question: q9"));
        assert!(!context.contains("[11]"));
        assert!(context.contains("Graph Connections: 8"));
        assert_eq!(context.matches("Related: ").count(), 5);
    }
}
