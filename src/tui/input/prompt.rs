use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::{Position, TaskId, TaskPatch};
use crate::session::UserEdit;
use crate::tui::app::{App, MessageSender, Mode, PromptKind};

use super::navigate::new_task;

/// Search mode: the term applies as it is typed.
pub fn handle_search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input.clear();
            app.session.set_search("");
            app.mode = Mode::Navigate;
        }
        KeyCode::Enter => app.mode = Mode::Navigate,
        KeyCode::Backspace => {
            app.input.pop();
            let term = app.input.clone();
            app.session.set_search(&term);
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.push(c);
            let term = app.input.clone();
            app.session.set_search(&term);
        }
        _ => {}
    }
}

pub fn handle_prompt(app: &mut App, kind: PromptKind, key: KeyEvent, tx: &MessageSender) {
    match key.code {
        KeyCode::Esc => {
            app.input.clear();
            app.mode = Mode::Navigate;
        }
        KeyCode::Enter => {
            let title = app.input.trim().to_string();
            app.input.clear();
            app.mode = Mode::Navigate;
            if title.is_empty() {
                return;
            }
            let edit = match kind {
                PromptKind::NewTask => UserEdit::CreateTask(new_task(app, &title)),
                PromptKind::Rename(id) => UserEdit::UpdateTask {
                    id,
                    patch: TaskPatch::title(title),
                },
            };
            app.submit(edit, tx);
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.input.push(c),
        _ => {}
    }
}

/// Move mode: arrows drag the node locally, Enter commits the position.
pub fn handle_move(
    app: &mut App,
    id: TaskId,
    origin: Position,
    key: KeyEvent,
    tx: &MessageSender,
) {
    let Some(current) = app.session.graph().node(id).map(|n| n.position) else {
        app.mode = Mode::Navigate;
        return;
    };
    let (dx, dy) = match key.code {
        KeyCode::Left | KeyCode::Char('h') => (-app.step.x, 0.0),
        KeyCode::Right | KeyCode::Char('l') => (app.step.x, 0.0),
        KeyCode::Up | KeyCode::Char('k') => (0.0, -app.step.y),
        KeyCode::Down | KeyCode::Char('j') => (0.0, app.step.y),
        KeyCode::Enter | KeyCode::Char('m') => {
            app.mode = Mode::Navigate;
            if current != origin
                && let Some(edit) = app.session.commit_drag(id)
            {
                app.submit(edit, tx);
            }
            return;
        }
        KeyCode::Esc => {
            app.session.drag_to(id, origin);
            app.mode = Mode::Navigate;
            return;
        }
        _ => return,
    };
    app.session
        .drag_to(id, Position::new(current.x + dx, current.y + dy));
}
