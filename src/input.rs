use std::time::Instant;

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::trace;

use crate::backend::Backend;
use crate::runtime::{key_name, TimedKey};
use crate::workflow::{AppState, Controller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Routes one terminal key event to the controller.
///
/// Command keys (Esc, F-keys, Ctrl-C) and overlay navigation are consumed
/// here and never reach the recorder. When the terminal cannot report key
/// releases, `synthesize_release` emits a release right after each press.
pub fn dispatch<B: Backend>(
    c: &mut Controller<B>,
    key: &TimedKey,
    epoch: Instant,
    synthesize_release: bool,
) -> Flow {
    let ev = &key.event;

    if key.is_press() {
        if ev.modifiers.contains(KeyModifiers::CONTROL) && ev.code == KeyCode::Char('c') {
            return Flow::Quit;
        }
        if let Some(flow) = command_key(c, ev.code) {
            return flow;
        }
        if c.overlay().is_some() {
            overlay_key(c, ev.code);
            return Flow::Continue;
        }
    } else if is_command_code(ev.code) || c.overlay().is_some() {
        return Flow::Continue;
    }

    let Some(name) = key_name(&ev.code) else {
        trace!(code = ?ev.code, "unmapped key ignored");
        return Flow::Continue;
    };
    let at_ms = key.millis_since(epoch);

    if key.is_press() {
        c.key_down(&name, at_ms);
        if synthesize_release {
            c.key_up(&name, at_ms);
        }
    } else {
        c.key_up(&name, at_ms);
    }
    Flow::Continue
}

fn is_command_code(code: KeyCode) -> bool {
    matches!(code, KeyCode::Esc | KeyCode::F(_))
}

fn command_key<B: Backend>(c: &mut Controller<B>, code: KeyCode) -> Option<Flow> {
    match code {
        KeyCode::Esc if c.overlay().is_some() => c.close_overlay(),
        KeyCode::Esc => return Some(Flow::Quit),
        KeyCode::F(2) if c.state() == AppState::Auth => c.toggle_auth_mode(),
        KeyCode::F(3) => c.show_users(),
        KeyCode::F(4) => c.show_leaderboard(),
        KeyCode::F(5) => c.show_my_profile(),
        KeyCode::F(6) => {
            c.train_model();
        }
        KeyCode::F(10) if c.is_logged_in() => c.logout(),
        KeyCode::F(_) => {}
        _ => return None,
    }
    Some(Flow::Continue)
}

fn overlay_key<B: Backend>(c: &mut Controller<B>, code: KeyCode) {
    match code {
        KeyCode::Up => c.move_selection(-1),
        KeyCode::Down => c.move_selection(1),
        KeyCode::Enter => c.open_selected_user(),
        KeyCode::Char('b') | KeyCode::Backspace => c.overlay_back(),
        KeyCode::Char('a') => {
            c.add_more_samples();
        }
        _ => {}
    }
}
