use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::graph::VisualGraph;
use crate::history::{Applied, Direction, HistoryError, Replay, dispatch};
use crate::model::{CascadeConfig, Position, ProjectSnapshot, TaskId};
use crate::service::ServiceError;
use crate::session::{EditOutcome, Session, SessionError, UserEdit};

use super::input;
use super::render;
use super::theme::Theme;

/// How long a notice stays in the status row
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Navigate,
    /// Typing a search term; the graph dims live
    Search,
    /// Typing a title
    Prompt(PromptKind),
    /// Nudging a node; `origin` is where the drag started
    Move { id: TaskId, origin: Position },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    NewTask,
    Rename(TaskId),
}

/// Transient message in the status row
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    pub at: Instant,
}

/// Results of spawned service calls, fed back into the event loop
#[derive(Debug)]
pub enum AppMessage {
    Edited(EditOutcome),
    Replayed {
        replay: Replay,
        result: Result<Applied, ServiceError>,
    },
    Refreshed(Result<ProjectSnapshot, ServiceError>),
}

pub type MessageSender = mpsc::UnboundedSender<AppMessage>;

/// Visible region of graph space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            x: [0.0, 1000.0],
            y: [-600.0, 0.0],
        }
    }
}

impl Viewport {
    /// Bounds that show every node. Canvas y grows upward, so graph y is negated.
    pub fn fit(graph: &VisualGraph, label_width: f64) -> Self {
        let Some(first) = graph.nodes.first() else {
            return Viewport::default();
        };
        let (mut min_x, mut max_x) = (first.position.x, first.position.x);
        let (mut min_y, mut max_y) = (first.position.y, first.position.y);
        for node in &graph.nodes {
            min_x = min_x.min(node.position.x);
            max_x = max_x.max(node.position.x);
            min_y = min_y.min(node.position.y);
            max_y = max_y.max(node.position.y);
        }
        let pad_y = ((max_y - min_y) * 0.1).max(20.0);
        Viewport {
            x: [min_x - label_width * 0.1, max_x + label_width],
            y: [-max_y - pad_y, -min_y + pad_y],
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x = [self.x[0] + dx, self.x[1] + dx];
        self.y = [self.y[0] + dy, self.y[1] + dy];
    }
}

/// Main application state
pub struct App {
    pub session: Session,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    /// Search or prompt text being typed
    pub input: String,
    pub notice: Option<Notice>,
    pub viewport: Viewport,
    /// Grid step for nudging nodes and panning
    pub step: Position,
    /// Edits sent and not yet answered
    pub pending_edits: usize,
    pub refreshing: bool,
    /// A refresh was asked for while one was in flight; its answer may predate an edit
    refresh_again: bool,
    pub show_help: bool,
}

impl App {
    pub fn new(session: Session, config: &CascadeConfig) -> Self {
        App {
            session,
            mode: Mode::Navigate,
            should_quit: false,
            theme: Theme::from_colors(&config.view.colors),
            input: String::new(),
            notice: None,
            viewport: Viewport::default(),
            step: Position::new(config.view.column_spacing / 5.0, config.view.row_spacing / 2.0),
            pending_edits: 0,
            refreshing: false,
            refresh_again: false,
            show_help: false,
        }
    }

    pub fn selected(&self) -> Option<TaskId> {
        self.session.view().selected
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: false,
            at: Instant::now(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: true,
            at: Instant::now(),
        });
    }

    /// Drop the notice once it has been shown long enough
    pub fn expire_notice(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| n.at.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }

    pub fn fit_view(&mut self) {
        self.viewport = Viewport::fit(self.session.graph(), self.step.x * 5.0);
    }

    /// Node ids in reading order (left to right, then top to bottom)
    pub fn ordered_nodes(&self) -> Vec<TaskId> {
        let mut nodes: Vec<_> = self
            .session
            .graph()
            .nodes
            .iter()
            .map(|n| (n.position.x, n.position.y, n.id))
            .collect();
        nodes.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        nodes.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Move the selection through the reading order, wrapping around.
    pub fn cycle_selection(&mut self, forward: bool) {
        let order = self.ordered_nodes();
        if order.is_empty() {
            return;
        }
        let next = match self
            .selected()
            .and_then(|id| order.iter().position(|o| *o == id))
        {
            Some(i) if forward => (i + 1) % order.len(),
            Some(i) => (i + order.len() - 1) % order.len(),
            None if forward => 0,
            None => order.len() - 1,
        };
        self.session.select(Some(order[next]));
    }

    // -----------------------------------------------------------------------
    // Service calls
    // -----------------------------------------------------------------------

    /// Send a user edit without blocking the loop.
    pub fn submit(&mut self, edit: UserEdit, tx: &MessageSender) {
        let pending = match self.session.prepare(edit) {
            Ok(p) => p,
            Err(e) => {
                self.error(e.to_string());
                return;
            }
        };
        self.pending_edits += 1;
        let service = self.session.service();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = pending.run(service.as_ref()).await;
            let _ = tx.send(AppMessage::Edited(outcome));
        });
    }

    /// Start an undo or redo. The stack pop happens here, before any await.
    pub fn replay(&mut self, direction: Direction, tx: &MessageSender) {
        let replay = match self.session.begin_replay(direction) {
            Ok(r) => r,
            Err(SessionError::History(e)) if e.is_empty_stack() => {
                self.info(e.to_string());
                return;
            }
            Err(e) => {
                self.error(e.to_string());
                return;
            }
        };
        tracing::debug!(%direction, op = %replay.operation().description, "replay started");
        let service = self.session.service();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = dispatch(service.as_ref(), replay.mutation()).await;
            let _ = tx.send(AppMessage::Replayed { replay, result });
        });
    }

    pub fn request_refresh(&mut self, tx: &MessageSender) {
        if self.refreshing {
            self.refresh_again = true;
            return;
        }
        self.refreshing = true;
        let service = self.session.service();
        let project = self.session.project();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = service.snapshot(project).await;
            let _ = tx.send(AppMessage::Refreshed(result));
        });
    }

    pub fn handle_message(&mut self, msg: AppMessage, tx: &MessageSender) {
        match msg {
            AppMessage::Edited(outcome) => {
                self.pending_edits = self.pending_edits.saturating_sub(1);
                match self.session.settle(outcome) {
                    Ok(Some(description)) => self.info(description),
                    Ok(None) => {}
                    Err(e) => self.error(e.to_string()),
                }
                self.request_refresh(tx);
            }
            AppMessage::Replayed { replay, result } => {
                match self.session.finish_replay(replay, result) {
                    Ok(report) => {
                        let verb = match report.direction {
                            Direction::Undo => "Undid",
                            Direction::Redo => "Redid",
                        };
                        if report.applied.skipped_dependencies.is_empty() {
                            self.info(format!("{} {}", verb, report.description));
                        } else {
                            self.error(format!(
                                "{} {} ({} dependencies could not be restored)",
                                verb,
                                report.description,
                                report.applied.skipped_dependencies.len()
                            ));
                        }
                    }
                    Err(SessionError::History(HistoryError::Stale(_))) => {}
                    Err(e) => self.error(e.to_string()),
                }
                self.request_refresh(tx);
            }
            AppMessage::Refreshed(result) => {
                self.refreshing = false;
                if std::mem::take(&mut self.refresh_again) {
                    self.request_refresh(tx);
                }
                match result {
                    Ok(snapshot) => {
                        if self.session.apply_snapshot(snapshot).fit_view {
                            self.fit_view();
                        }
                    }
                    Err(e) => self.error(format!("refresh failed: {}", e)),
                }
            }
        }
    }
}

/// Run the TUI until the user quits
pub async fn run(session: Session, config: &CascadeConfig) -> Result<(), io::Error> {
    let mut app = App::new(session, config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Restore the terminal before the panic message prints
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let poll_every = Duration::from_millis(config.view.poll_interval_ms.max(250));
    let result = run_event_loop(&mut terminal, &mut app, poll_every).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poll_every: Duration,
) -> Result<(), io::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut events = EventStream::new();
    let mut poll = tokio::time::interval(poll_every);
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    input::handle_key(app, key, &tx);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            },
            Some(msg) = rx.recv() => app.handle_message(msg, &tx),
            _ = poll.tick() => app.request_refresh(&tx),
            _ = tick.tick() => app.expire_notice(),
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, TaskPatch};
    use crate::service::MemoryService;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn seeded_app() -> (
        Arc<MemoryService>,
        App,
        MessageSender,
        mpsc::UnboundedReceiver<AppMessage>,
    ) {
        let (service, project) =
            MemoryService::seeded(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).await;
        let service = Arc::new(service);
        let config = CascadeConfig::default();
        let mut session = Session::new(service.clone(), project, &config);
        session.refresh().await.unwrap();
        let mut app = App::new(session, &config);
        app.fit_view();
        let (tx, rx) = mpsc::unbounded_channel();
        (service, app, tx, rx)
    }

    /// Feed spawned results back until nothing is in flight.
    async fn settle(
        app: &mut App,
        tx: &MessageSender,
        rx: &mut mpsc::UnboundedReceiver<AppMessage>,
    ) {
        while app.pending_edits > 0 || app.refreshing || app.session.history().is_replaying() {
            let Some(msg) = rx.recv().await else { break };
            app.handle_message(msg, tx);
        }
    }

    fn id_of(app: &App, title: &str) -> TaskId {
        app.session
            .snapshot()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.title == title)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn rename_then_undo_through_the_loop() {
        let (service, mut app, tx, mut rx) = seeded_app().await;
        let design = id_of(&app, "Design");
        app.submit(
            UserEdit::UpdateTask {
                id: design,
                patch: TaskPatch::title("Discovery"),
            },
            &tx,
        );
        settle(&mut app, &tx, &mut rx).await;
        assert_eq!(service.task(design).await.unwrap().title, "Discovery");
        assert_eq!(
            app.notice.as_ref().unwrap().text,
            "Edit title of \"Design\""
        );

        app.replay(Direction::Undo, &tx);
        // A second undo while the first is in flight is refused
        app.replay(Direction::Undo, &tx);
        assert!(app.notice.as_ref().unwrap().is_error);
        settle(&mut app, &tx, &mut rx).await;

        assert_eq!(service.task(design).await.unwrap().title, "Design");
        assert_eq!(app.session.graph().node(design).unwrap().data.title, "Design");
        assert!(app.session.history().can_redo());
    }

    #[tokio::test]
    async fn empty_undo_is_informational() {
        let (_service, mut app, tx, _rx) = seeded_app().await;
        app.replay(Direction::Undo, &tx);
        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.text, "nothing to undo");
        assert!(!notice.is_error);
    }

    #[tokio::test]
    async fn failed_edit_shows_error_and_records_nothing() {
        let (service, mut app, tx, mut rx) = seeded_app().await;
        service.fail_next("offline").await;
        app.submit(
            UserEdit::CreateTask(NewTask::new(app.session.project(), "Test")),
            &tx,
        );
        settle(&mut app, &tx, &mut rx).await;
        assert!(app.notice.as_ref().unwrap().is_error);
        assert!(!app.session.history().can_undo());
    }

    #[tokio::test]
    async fn cycle_selection_wraps() {
        let (_service, mut app, _tx, _rx) = seeded_app().await;
        let order = app.ordered_nodes();
        assert_eq!(order.len(), 3);
        app.cycle_selection(false);
        assert_eq!(app.selected(), Some(order[2]));
        app.cycle_selection(true);
        assert_eq!(app.selected(), Some(order[0]));
    }

    #[test]
    fn fit_covers_all_nodes() {
        use crate::graph::{NodeData, NodeFlags, VisualNode};
        use crate::model::{ProjectId, Task};
        let task = Task::new(
            ProjectId::new(),
            "A",
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        );
        let node = |x, y| VisualNode {
            id: TaskId::new(),
            position: Position::new(x, y),
            data: NodeData::new(&task, NodeFlags::default()),
        };
        let graph = VisualGraph {
            nodes: vec![node(0.0, 0.0), node(500.0, 300.0)],
            edges: vec![],
        };
        let vp = Viewport::fit(&graph, 100.0);
        assert!(vp.x[0] <= 0.0 && vp.x[1] >= 600.0);
        assert!(vp.y[0] <= -300.0 && vp.y[1] >= 0.0);
    }
}
