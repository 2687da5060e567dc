use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::graph::LinkMode;
use crate::tui::app::{App, Mode, PromptKind};
use crate::util::unicode::{display_width, gap_between, truncate_to_width};

/// Bottom row: mode prompt or notice on the left, history on the right
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let base = Style::default().fg(app.theme.text).bg(bg);

    let (left, left_style) = left_text(app, base);
    let right = right_text(app);

    let mut spans = Vec::new();
    match gap_between(&left, &right, width) {
        Some(gap) => {
            spans.push(Span::styled(left, left_style));
            spans.push(Span::styled(" ".repeat(gap), base));
            spans.push(Span::styled(right, base.fg(app.theme.dim)));
        }
        // Not enough room for both: the left side wins
        None => spans.push(Span::styled(truncate_to_width(&left, width), left_style)),
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(bg)),
        area,
    );
}

fn left_text(app: &App, base: Style) -> (String, Style) {
    let theme = &app.theme;
    let cursor = "\u{258C}";
    match app.mode {
        Mode::Search => (
            format!(" /{}{}", app.input, cursor),
            base.fg(theme.highlight),
        ),
        Mode::Prompt(kind) => {
            let label = match kind {
                PromptKind::NewTask => "New task",
                PromptKind::Rename(_) => "Rename",
            };
            (
                format!(" {}: {}{}", label, app.input, cursor),
                base.fg(theme.text_bright),
            )
        }
        Mode::Move { .. } => (
            " MOVE  hjkl/arrows nudge  Enter keep  Esc cancel".to_string(),
            base.fg(theme.highlight),
        ),
        Mode::Navigate => {
            if let LinkMode::Sourcing(source) = app.session.link_mode() {
                let title = app
                    .session
                    .task(source)
                    .map(|t| t.title.as_str())
                    .unwrap_or("?");
                return (
                    format!(" LINK from {}  pick a target, Esc cancels", title),
                    base.fg(theme.link),
                );
            }
            match &app.notice {
                Some(n) if n.is_error => (format!(" {}", n.text), base.fg(theme.error)),
                Some(n) => (format!(" {}", n.text), base.fg(theme.ok)),
                None => (" ? help".to_string(), base.fg(theme.dim)),
            }
        }
    }
}

fn right_text(app: &App) -> String {
    let history = app.session.history();
    let mut parts = Vec::new();
    if app.pending_edits > 0 || history.is_replaying() {
        parts.push("saving\u{2026}".to_string());
    }
    if let Some(desc) = history.undo_description() {
        parts.push(format!("undo: {}", desc));
    }
    if let Some(desc) = history.redo_description() {
        parts.push(format!("redo: {}", desc));
    }
    let text = parts.join("  ");
    if text.is_empty() {
        return text;
    }
    let mut out = format!("{} ", text);
    if display_width(&out) > 48 {
        out = format!("{} ", truncate_to_width(&text, 47));
    }
    out
}
