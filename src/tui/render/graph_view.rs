use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as Segment};
use ratatui::widgets::{Block, Paragraph};

use crate::graph::VisualNode;
use crate::tui::app::{App, Mode};
use crate::util::unicode::truncate_to_width;

/// Longest label drawn on the canvas, in cells
const LABEL_CELLS: usize = 22;

/// Text drawn at a node's anchor
pub fn node_label(node: &VisualNode) -> String {
    let flags = &node.data.flags;
    let marker = if flags.is_link_source {
        "\u{00BB} "
    } else if node.data.is_milestone {
        "\u{25C6} "
    } else {
        ""
    };
    let title = truncate_to_width(&node.data.title, LABEL_CELLS);
    format!("[{}{}]", marker, title)
}

/// Draw the dependency graph: edges first, labels on top.
pub fn render_graph_view(frame: &mut Frame, app: &App, area: Rect) {
    let graph = app.session.graph();
    let bg = app.theme.background;

    if graph.nodes.is_empty() {
        let text = if app.session.snapshot().is_some() {
            "No tasks yet. Press a to add one."
        } else {
            "Loading\u{2026}"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(app.theme.dim).bg(bg),
        )))
        .style(Style::default().bg(bg));
        frame.render_widget(paragraph, area);
        return;
    }

    let moving = match app.mode {
        Mode::Move { id, .. } => Some(id),
        _ => None,
    };
    let viewport = app.viewport;
    let theme = &app.theme;
    let searching = !app.session.view().search.trim().is_empty();

    let canvas = Canvas::default()
        .block(Block::default().style(Style::default().bg(bg)))
        .background_color(bg)
        .marker(Marker::Braille)
        .x_bounds(viewport.x)
        .y_bounds(viewport.y)
        .paint(move |ctx| {
            for edge in &graph.edges {
                let dep = edge.dependency;
                let (Some(from), Some(to)) =
                    (graph.node(dep.predecessor_id), graph.node(dep.successor_id))
                else {
                    continue;
                };
                ctx.draw(&Segment {
                    x1: from.position.x,
                    y1: -from.position.y,
                    x2: to.position.x,
                    y2: -to.position.y,
                    color: theme.edge_color(edge.is_critical),
                });
            }
            ctx.layer();
            for node in &graph.nodes {
                let mut style = theme.node_style(&node.data.flags, searching);
                if moving == Some(node.id) {
                    style = style.fg(theme.highlight);
                }
                ctx.print(
                    node.position.x,
                    -node.position.y,
                    Line::from(Span::styled(node_label(node), style)),
                );
            }
        });
    frame.render_widget(canvas, area);
}
