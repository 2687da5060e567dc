use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::App;

const BINDINGS: &[(&str, &str)] = &[
    ("Tab j / k", "select next / previous"),
    ("a", "add task"),
    ("e", "rename"),
    ("d", "delete"),
    ("< >", "shorter / longer"),
    ("l Enter", "link from selection, then pick target"),
    ("m", "move selection"),
    ("/", "search"),
    ("u z ^Z", "undo"),
    ("Z ^Y", "redo"),
    ("arrows", "pan"),
    ("f", "fit view"),
    ("r", "refresh"),
    ("x", "clear selection"),
    ("Esc", "cancel link"),
    ("q", "quit"),
];

/// Key reference drawn over the middle of the screen
pub fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let width = 52.min(area.width);
    let height = (BINDINGS.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let bg = app.theme.background;
    let key_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(app.theme.text).bg(bg);

    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!(" {:<10}", keys), key_style),
                Span::styled(*what, text_style),
            ])
        })
        .collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" keys ")
                .style(Style::default().fg(app.theme.dim).bg(bg)),
        ),
        popup,
    );
}
