use chrono::Local;

use crate::history::Direction;
use crate::model::{NewTask, Position, TaskPatch};
use crate::session::UserEdit;
use crate::tui::app::{App, MessageSender, Mode, PromptKind};

use super::Action;

pub fn perform(app: &mut App, action: Action, tx: &MessageSender) {
    match action {
        Action::Quit => app.should_quit = true,
        Action::Undo => app.replay(Direction::Undo, tx),
        Action::Redo => app.replay(Direction::Redo, tx),
        Action::SelectNext => app.cycle_selection(true),
        Action::SelectPrev => app.cycle_selection(false),
        Action::ClearSelection => app.session.select(None),
        Action::StartSearch => {
            app.input = app.session.view().search.clone();
            app.mode = Mode::Search;
        }
        Action::NewTask => {
            app.input.clear();
            app.mode = Mode::Prompt(PromptKind::NewTask);
        }
        Action::Rename => {
            if let Some(task) = app.selected().and_then(|id| app.session.task(id)) {
                let (id, title) = (task.id, task.title.clone());
                app.input = title;
                app.mode = Mode::Prompt(PromptKind::Rename(id));
            }
        }
        Action::Delete => {
            if let Some(id) = app.selected() {
                app.submit(UserEdit::DeleteTask(id), tx);
            }
        }
        Action::LongerDuration => change_duration(app, 1, tx),
        Action::ShorterDuration => change_duration(app, -1, tx),
        Action::Link => link(app, tx),
        Action::CancelLink => {
            if app.session.link_mode().is_active() {
                app.session.cancel_link();
                app.info("link cancelled");
            } else {
                app.session.set_search("");
            }
        }
        Action::Move => {
            if let Some(node) = app.selected().and_then(|id| app.session.graph().node(id)) {
                app.mode = Mode::Move {
                    id: node.id,
                    origin: node.position,
                };
            }
        }
        Action::Pan(dx, dy) => {
            let (sx, sy) = (app.step.x * 2.0, app.step.y * 2.0);
            app.viewport.pan(f64::from(dx) * sx, f64::from(dy) * sy);
        }
        Action::FitView => app.fit_view(),
        Action::Refresh => app.request_refresh(tx),
        Action::ToggleHelp => app.show_help = !app.show_help,
    }
}

fn change_duration(app: &mut App, delta: i64, tx: &MessageSender) {
    let Some(task) = app.selected().and_then(|id| app.session.task(id)) else {
        return;
    };
    let days = (i64::from(task.duration_days) + delta).max(0);
    let id = task.id;
    let patch = TaskPatch {
        duration_days: Some(days as u32),
        ..Default::default()
    };
    app.submit(UserEdit::UpdateTask { id, patch }, tx);
}

/// First press starts link mode on the selection; the next press on another
/// task links (or unlinks, if the edge exists) source to target.
fn link(app: &mut App, tx: &MessageSender) {
    let Some(selected) = app.selected() else {
        app.info("select a task first");
        return;
    };
    if !app.session.link_mode().is_active() {
        app.session.start_link(selected);
        app.info("link: pick a successor (Esc cancels)");
        return;
    }
    let Some(dependency) = app.session.pick_link(selected) else {
        // Self-pick: still sourcing
        return;
    };
    let exists = app
        .session
        .snapshot()
        .is_some_and(|s| s.dependencies.contains(&dependency));
    let edit = if exists {
        UserEdit::DeleteDependency(dependency)
    } else {
        UserEdit::CreateDependency(dependency)
    };
    app.submit(edit, tx);
}

/// New task placed right of the selection, or at the origin.
pub(super) fn new_task(app: &App, title: &str) -> NewTask {
    let mut req = NewTask::new(app.session.project(), title);
    req.start_date = Some(Local::now().date_naive());
    req.position = Some(
        app.selected()
            .and_then(|id| app.session.graph().node(id))
            .map(|n| Position::new(n.position.x + app.step.x * 5.0, n.position.y))
            .unwrap_or(Position::new(0.0, 0.0)),
    );
    req
}
