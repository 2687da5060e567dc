use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::util::unicode::gap_between;

/// Title bar: counts on the left, last fetch time on the right
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let graph = app.session.graph();
    let critical = graph
        .nodes
        .iter()
        .filter(|n| n.data.flags.is_critical)
        .count();

    let left = format!(
        " cascade  {} tasks  {} deps  {} critical",
        graph.nodes.len(),
        graph.edges.len(),
        critical
    );
    let right = match app.session.snapshot() {
        Some(s) => format!("fetched {} ", s.fetched_at.format("%H:%M:%S")),
        None => "loading\u{2026} ".to_string(),
    };

    let mut spans = vec![Span::styled(
        left.clone(),
        Style::default()
            .fg(app.theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(gap) = gap_between(&left, &right, area.width as usize) {
        spans.push(Span::styled(" ".repeat(gap), Style::default().bg(bg)));
        spans.push(Span::styled(right, Style::default().fg(app.theme.dim).bg(bg)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}
