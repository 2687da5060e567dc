mod navigate;
mod prompt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, MessageSender, Mode};

pub use navigate::perform;

/// Everything a key can do in navigate mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Undo,
    Redo,
    SelectNext,
    SelectPrev,
    ClearSelection,
    StartSearch,
    NewTask,
    Rename,
    Delete,
    LongerDuration,
    ShorterDuration,
    /// Link mode: start on the selection, or pick the selection as target
    Link,
    CancelLink,
    Move,
    Pan(i8, i8),
    FitView,
    Refresh,
    ToggleHelp,
}

/// Key binding table for navigate mode.
pub fn navigate_action(key: KeyEvent) -> Option<Action> {
    let action = match (key.modifiers, key.code) {
        (m, KeyCode::Char('c')) if m.contains(KeyModifiers::CONTROL) => Action::Quit,
        (KeyModifiers::NONE, KeyCode::Char('q')) => Action::Quit,

        // Redo: Z, Ctrl/Super+Y, Ctrl+Shift+Z, or Super+Shift+Z (must be checked BEFORE undo)
        (m, KeyCode::Char('y')) if m.contains(KeyModifiers::CONTROL) => Action::Redo,
        (m, KeyCode::Char('y')) if m.contains(KeyModifiers::SUPER) => Action::Redo,
        (m, KeyCode::Char('z') | KeyCode::Char('Z'))
            if m.contains(KeyModifiers::CONTROL) && m.contains(KeyModifiers::SHIFT) =>
        {
            Action::Redo
        }
        (m, KeyCode::Char('z') | KeyCode::Char('Z'))
            if m.contains(KeyModifiers::SUPER) && m.contains(KeyModifiers::SHIFT) =>
        {
            Action::Redo
        }
        (KeyModifiers::SHIFT, KeyCode::Char('Z')) => Action::Redo,

        // Undo: u, z, Ctrl+Z, or Super+Z
        (KeyModifiers::NONE, KeyCode::Char('u') | KeyCode::Char('z')) => Action::Undo,
        (m, KeyCode::Char('z')) if m.contains(KeyModifiers::CONTROL) => Action::Undo,
        (m, KeyCode::Char('z')) if m.contains(KeyModifiers::SUPER) => Action::Undo,

        (KeyModifiers::NONE, KeyCode::Tab | KeyCode::Char('j')) => Action::SelectNext,
        (_, KeyCode::BackTab) | (KeyModifiers::NONE, KeyCode::Char('k')) => Action::SelectPrev,
        (KeyModifiers::NONE, KeyCode::Esc) => Action::CancelLink,
        (KeyModifiers::NONE, KeyCode::Char('/')) => Action::StartSearch,
        (KeyModifiers::NONE, KeyCode::Char('a')) => Action::NewTask,
        (KeyModifiers::NONE, KeyCode::Char('e')) => Action::Rename,
        (KeyModifiers::NONE, KeyCode::Char('d') | KeyCode::Delete) => Action::Delete,
        (_, KeyCode::Char('>')) => Action::LongerDuration,
        (_, KeyCode::Char('<')) => Action::ShorterDuration,
        (KeyModifiers::NONE, KeyCode::Char('l') | KeyCode::Enter) => Action::Link,
        (KeyModifiers::NONE, KeyCode::Char('m')) => Action::Move,
        (KeyModifiers::NONE, KeyCode::Left) => Action::Pan(-1, 0),
        (KeyModifiers::NONE, KeyCode::Right) => Action::Pan(1, 0),
        (KeyModifiers::NONE, KeyCode::Up) => Action::Pan(0, 1),
        (KeyModifiers::NONE, KeyCode::Down) => Action::Pan(0, -1),
        (KeyModifiers::NONE, KeyCode::Char('f')) => Action::FitView,
        (KeyModifiers::NONE, KeyCode::Char('r')) => Action::Refresh,
        (KeyModifiers::NONE, KeyCode::Char('x')) => Action::ClearSelection,
        (_, KeyCode::Char('?')) => Action::ToggleHelp,
        _ => return None,
    };
    Some(action)
}

/// Handle a key event in the current mode
pub fn handle_key(app: &mut App, key: KeyEvent, tx: &MessageSender) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.mode {
        Mode::Navigate => {
            if let Some(action) = navigate_action(key) {
                perform(app, action, tx);
            }
        }
        Mode::Search => prompt::handle_search(app, key),
        Mode::Prompt(kind) => prompt::handle_prompt(app, kind, key, tx),
        Mode::Move { id, origin } => prompt::handle_move(app, id, origin, key, tx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn undo_bindings() {
        for k in [
            key(KeyCode::Char('z'), KeyModifiers::CONTROL),
            key(KeyCode::Char('z'), KeyModifiers::SUPER),
            key(KeyCode::Char('z'), KeyModifiers::NONE),
            key(KeyCode::Char('u'), KeyModifiers::NONE),
        ] {
            assert_eq!(navigate_action(k), Some(Action::Undo), "{:?}", k);
        }
    }

    #[test]
    fn redo_bindings() {
        for k in [
            key(KeyCode::Char('y'), KeyModifiers::CONTROL),
            key(KeyCode::Char('y'), KeyModifiers::SUPER),
            key(
                KeyCode::Char('Z'),
                KeyModifiers::CONTROL | KeyModifiers::SHIFT,
            ),
            key(
                KeyCode::Char('z'),
                KeyModifiers::CONTROL | KeyModifiers::SHIFT,
            ),
            key(KeyCode::Char('Z'), KeyModifiers::SUPER | KeyModifiers::SHIFT),
            key(KeyCode::Char('Z'), KeyModifiers::SHIFT),
        ] {
            assert_eq!(navigate_action(k), Some(Action::Redo), "{:?}", k);
        }
    }

    #[test]
    fn link_and_quit_bindings() {
        assert_eq!(
            navigate_action(key(KeyCode::Char('l'), KeyModifiers::NONE)),
            Some(Action::Link)
        );
        assert_eq!(
            navigate_action(key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Action::CancelLink)
        );
        assert_eq!(
            navigate_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(
            navigate_action(key(KeyCode::Char('w'), KeyModifiers::NONE)),
            None
        );
    }
}
