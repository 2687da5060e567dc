use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;
use crate::util::unicode::truncate_to_width;

/// Two lines about the selected task: schedule, then description.
pub fn render_detail_panel(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let base = Style::default().fg(app.theme.text).bg(bg);
    let width = area.width as usize;

    let node = app.selected().and_then(|id| app.session.graph().node(id));
    let lines = match node {
        None => vec![Line::from(Span::styled(
            truncate_to_width(" Tab/j/k select a task, ? for help", width),
            Style::default().fg(app.theme.dim).bg(bg),
        ))],
        Some(node) => {
            let data = &node.data;
            let duration = if data.is_milestone {
                "milestone".to_string()
            } else {
                format!("{}d", data.duration_days)
            };
            let mut spans = vec![
                Span::styled(
                    format!(" {}", data.title),
                    base.fg(app.theme.text_bright).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  {} \u{2192} {}  {}",
                        data.start_date.format("%Y-%m-%d"),
                        data.end_date.format("%Y-%m-%d"),
                        duration
                    ),
                    base,
                ),
            ];
            if data.flags.is_critical {
                spans.push(Span::styled("  critical", base.fg(app.theme.critical)));
            }
            let slack = app.session.snapshot().and_then(|s| s.slack.get(&node.id));
            if let Some(days) = slack {
                spans.push(Span::styled(format!("  slack {}d", days), base.fg(app.theme.dim)));
            }
            let description = data.description.as_deref().unwrap_or("");
            vec![
                Line::from(spans),
                Line::from(Span::styled(
                    truncate_to_width(&format!(" {}", description), width),
                    base.fg(app.theme.dim),
                )),
            ]
        }
    };

    frame.render_widget(Paragraph::new(lines).style(Style::default().bg(bg)), area);
}
