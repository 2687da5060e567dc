pub mod detail_panel;
pub mod graph_view;
pub mod header;
pub mod help_overlay;
pub mod status_row;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use super::app::App;

/// Main render function: header | graph | detail | status
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // graph canvas
            Constraint::Length(2), // selected task
            Constraint::Length(1), // status row
        ])
        .split(area);

    header::render_header(frame, app, chunks[0]);
    graph_view::render_graph_view(frame, app, chunks[1]);
    detail_panel::render_detail_panel(frame, app, chunks[2]);
    status_row::render_status_row(frame, app, chunks[3]);

    if app.show_help {
        help_overlay::render_help_overlay(frame, app, area);
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::{TERM_H, TERM_W, render_to_string, seeded_app};
    use super::*;

    #[tokio::test]
    async fn full_screen_shows_graph_and_chrome() {
        let app = seeded_app().await;
        let out = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &app));
        assert!(out.contains("3 tasks"), "{}", out);
        assert!(out.contains("Design"), "{}", out);
        assert!(out.contains("Build"), "{}", out);
        assert!(out.contains("Ship"), "{}", out);
    }

    #[tokio::test]
    async fn help_overlay_lists_undo() {
        let mut app = seeded_app().await;
        app.show_help = true;
        let out = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &app));
        assert!(out.contains("undo"), "{}", out);
    }
}
