//! Key and mouse bindings.

use crate::mode::Mode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    /// Pick up the tile under the cursor, or drop the held tile onto it.
    Grab,
    /// Cancel the drag in flight; quits when nothing is held.
    Cancel,
    SelectMode(Mode),
    NextMode,
    PrevMode,
    Restart,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Arrows and vim keys both move the cursor.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Grab,
        KeyCode::Char('1') => Action::SelectMode(Mode::Easy),
        KeyCode::Char('2') => Action::SelectMode(Mode::Hard),
        KeyCode::Char('3') => Action::SelectMode(Mode::Extreme),
        KeyCode::Char('m') | KeyCode::Tab => Action::NextMode,
        KeyCode::Char('M') | KeyCode::BackTab => Action::PrevMode,
        _ => Action::None,
    }
}

/// Abstract gesture produced by the pointer. Coordinates are terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Press { column: u16, row: u16 },
    Move { column: u16, row: u16 },
    Release { column: u16, row: u16 },
    Ignore,
}

pub fn mouse_to_pointer(ev: MouseEvent) -> Pointer {
    let (column, row) = (ev.column, ev.row);
    match ev.kind {
        MouseEventKind::Down(MouseButton::Left) => Pointer::Press { column, row },
        MouseEventKind::Drag(MouseButton::Left) => Pointer::Move { column, row },
        MouseEventKind::Up(MouseButton::Left) => Pointer::Release { column, row },
        _ => Pointer::Ignore,
    }
}

/// Move a cursor on a `columns`-wide grid of `count` cells, clamped to the edges.
pub fn step_cursor(cursor: usize, action: Action, columns: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let columns = columns.max(1);
    let cursor = cursor.min(count - 1);
    let (row, col) = (cursor / columns, cursor % columns);
    let next = match action {
        Action::CursorLeft if col > 0 => cursor - 1,
        Action::CursorRight if col + 1 < columns => cursor + 1,
        Action::CursorUp if row > 0 => cursor - columns,
        Action::CursorDown => cursor + columns,
        _ => cursor,
    };
    if next < count { next } else { cursor }
}
