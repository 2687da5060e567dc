use std::collections::HashMap;

use crate::graph::{VisualGraph, VisualNode};
use crate::model::TaskId;
use crate::util::unicode::{display_width, truncate_to_width};

const TITLE_CELLS: usize = 28;

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// Nodes in reading order, then edges. One line each. Search matches are
/// tagged only when `searching`.
pub fn format_graph(graph: &VisualGraph, searching: bool) -> String {
    let mut nodes: Vec<&VisualNode> = graph.nodes.iter().collect();
    nodes.sort_by(|a, b| {
        a.position
            .x
            .total_cmp(&b.position.x)
            .then(a.position.y.total_cmp(&b.position.y))
            .then_with(|| a.data.title.cmp(&b.data.title))
    });

    let mut lines = Vec::new();
    for node in &nodes {
        lines.push(format_node(node, searching));
    }

    if !graph.edges.is_empty() {
        lines.push(String::new());
        let titles: HashMap<TaskId, &str> = graph
            .nodes
            .iter()
            .map(|n| (n.id, n.data.title.as_str()))
            .collect();
        let name = |id: TaskId| titles.get(&id).copied().unwrap_or("?");
        for edge in &graph.edges {
            let dep = edge.dependency;
            let mut line = format!(
                "{} \u{2192} {}",
                name(dep.predecessor_id),
                name(dep.successor_id)
            );
            if edge.is_critical {
                line.push_str("  critical");
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn format_node(node: &VisualNode, searching: bool) -> String {
    let data = &node.data;
    let title = truncate_to_width(&data.title, TITLE_CELLS);
    let pad = TITLE_CELLS.saturating_sub(display_width(&title));
    let span = if data.is_milestone {
        format!("{}  milestone", data.start_date)
    } else {
        format!(
            "{} \u{2192} {}  {}d",
            data.start_date, data.end_date, data.duration_days
        )
    };

    let mut line = format!("{}{}  {}", title, " ".repeat(pad), span);
    if data.flags.is_critical {
        line.push_str("  critical");
    }
    if searching && data.flags.is_search_match {
        line.push_str("  match");
    }
    line
}
