use std::sync::Arc;

use chrono::NaiveDate;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::model::CascadeConfig;
use crate::service::MemoryService;
use crate::session::Session;
use crate::tui::app::App;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// App over the three-task demo project, refreshed and fitted.
pub async fn seeded_app() -> App {
    let (service, project) =
        MemoryService::seeded(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).await;
    let config = CascadeConfig::default();
    let mut session = Session::new(Arc::new(service), project, &config);
    session.refresh().await.unwrap();
    let mut app = App::new(session, &config);
    app.fit_view();
    app
}

/// Select the task with `title`.
pub fn select_title(app: &mut App, title: &str) {
    let id = app
        .session
        .snapshot()
        .unwrap()
        .tasks
        .iter()
        .find(|t| t.title == title)
        .map(|t| t.id);
    app.session.select(id);
}
