// Terminal events → UI-local edits (cursor, focus, input) or one domain `Command`.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use crate::persona::Persona;
use crate::tui::types::{App, Command, Focus, Mode};
use crate::tui::view::{CardGesture, CardPanel, gesture_command, project_grid, project_selected};

/// Width of the `[i]` info affordance at the right edge of each card row.
pub const INFO_COLUMNS: u16 = 3;

pub fn handle_event(app: &mut App, event: Event) -> Option<Command> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key, Instant::now()),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                handle_click(app, mouse.column, mouse.row, Instant::now())
            }
            MouseEventKind::ScrollUp if app.focus == Focus::Chat => {
                app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(3);
                None
            }
            MouseEventKind::ScrollDown if app.focus == Focus::Chat => {
                app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(3);
                None
            }
            _ => None,
        },
        _ => None,
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    // The detail overlay swallows everything; all dismissals converge on HideDetails.
    if app.modal.is_open() {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Command::HideDetails),
            _ => None,
        };
    }

    match app.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
                app.mode = Mode::Browse;
            }
            return None;
        }
        Mode::CategoryPicker => return handle_category_picker_key(app, key),
        Mode::Browse => {}
    }

    if ctrl {
        return match key.code {
            KeyCode::Char('g') => Some(Command::GenerateRoutine),
            KeyCode::Char('x') => Some(Command::ClearSelections),
            KeyCode::Char('k') => Some(Command::ClearConversation),
            _ => None,
        };
    }

    match key.code {
        KeyCode::F(1) => {
            app.mode = Mode::Help;
            return None;
        }
        KeyCode::F(2) => {
            open_category_picker(app);
            return None;
        }
        KeyCode::F(3) => return Some(Command::SetPersona(next_persona(app.orchestrator.persona()))),
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return None;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return None;
        }
        KeyCode::Esc => return Some(Command::Quit),
        _ => {}
    }

    match app.focus {
        Focus::Grid => handle_grid_key(app, key),
        Focus::Selected => handle_selected_key(app, key, now),
        Focus::Chat => handle_chat_key(app, key),
    }
}

fn next_persona(current: Persona) -> Persona {
    let idx = Persona::ALL.iter().position(|p| *p == current).unwrap_or(0);
    Persona::ALL[(idx + 1) % Persona::ALL.len()]
}

fn open_category_picker(app: &mut App) {
    if app.categories.is_empty() {
        app.status = if app.loading_catalog {
            "Catalog is still loading...".to_string()
        } else {
            "No categories available.".to_string()
        };
        return;
    }
    let idx = app
        .category
        .as_ref()
        .and_then(|c| app.categories.iter().position(|x| x == c))
        .unwrap_or(0);
    app.category_state.select(Some(idx));
    app.mode = Mode::CategoryPicker;
}

fn handle_category_picker_key(app: &mut App, key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Esc | KeyCode::F(2) => {
            app.mode = Mode::Browse;
            None
        }
        KeyCode::Up => {
            move_cursor(&mut app.category_state, app.categories.len(), -1);
            None
        }
        KeyCode::Down => {
            move_cursor(&mut app.category_state, app.categories.len(), 1);
            None
        }
        KeyCode::Enter => app
            .category_state
            .selected()
            .and_then(|idx| app.categories.get(idx))
            .map(|c| Command::SelectCategory(c.clone())),
        _ => None,
    }
}

fn handle_grid_key(app: &mut App, key: KeyEvent) -> Option<Command> {
    let grid = project_grid(app.visible_products.as_deref(), &app.selection);
    let len = grid.cards().len();
    let current = app.grid_state.selected().and_then(|idx| grid.card_at(idx)).map(|c| c.id);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(&mut app.grid_state, len, -1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(&mut app.grid_state, len, 1);
            None
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            current.and_then(|id| gesture_command(CardPanel::Grid, CardGesture::Click, id))
        }
        KeyCode::Char('i') => {
            current.and_then(|id| gesture_command(CardPanel::Grid, CardGesture::Info, id))
        }
        _ => None,
    }
}

fn handle_selected_key(app: &mut App, key: KeyEvent, now: Instant) -> Option<Command> {
    let list = project_selected(&app.selection);
    let len = list.cards().len();
    let current = app
        .selected_state
        .selected()
        .and_then(|idx| list.card_at(idx))
        .map(|c| c.id);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(&mut app.selected_state, len, -1);
            app.double_click.reset();
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(&mut app.selected_state, len, 1);
            app.double_click.reset();
            None
        }
        KeyCode::Enter | KeyCode::Delete | KeyCode::Backspace => {
            let id = current?;
            let gesture = app.double_click.classify(CardPanel::Selected, id, now);
            let command = gesture_command(CardPanel::Selected, gesture, id);
            if command.is_none() {
                app.status = "Press again to remove.".to_string();
            }
            command
        }
        KeyCode::Char('i') => {
            current.and_then(|id| gesture_command(CardPanel::Selected, CardGesture::Info, id))
        }
        _ => None,
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Enter => {
            if app.waiting() {
                app.status = "Still waiting for the previous reply...".to_string();
                return None;
            }
            let text: String = app.input.iter().collect();
            if text.trim().is_empty() {
                return None;
            }
            app.input.clear();
            app.cursor = 0;
            Some(Command::SubmitChat(text))
        }
        KeyCode::Char(ch) => {
            app.input.insert(app.cursor, ch);
            app.cursor += 1;
            None
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                app.input.remove(app.cursor);
            }
            None
        }
        KeyCode::Delete => {
            if app.cursor < app.input.len() {
                app.input.remove(app.cursor);
            }
            None
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
            None
        }
        KeyCode::Right => {
            app.cursor = (app.cursor + 1).min(app.input.len());
            None
        }
        KeyCode::Home => {
            app.cursor = 0;
            None
        }
        KeyCode::End => {
            app.cursor = app.input.len();
            None
        }
        KeyCode::PageUp => {
            app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(5);
            None
        }
        KeyCode::PageDown => {
            app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(5);
            None
        }
        _ => None,
    }
}

pub fn handle_click(app: &mut App, column: u16, row: u16, now: Instant) -> Option<Command> {
    if app.modal.is_open() {
        let close_hit = app.hit.modal_close.is_some_and(|r| contains(r, column, row));
        let inside = app.hit.modal.is_some_and(|r| contains(r, column, row));
        // Backdrop click or the close affordance; clicks on the pane content do nothing.
        return if close_hit || !inside {
            Some(Command::HideDetails)
        } else {
            None
        };
    }
    if app.mode != Mode::Browse {
        return None;
    }

    if let Some(idx) = row_index(app.hit.grid, &app.grid_state, column, row) {
        app.focus = Focus::Grid;
        let grid = project_grid(app.visible_products.as_deref(), &app.selection);
        let id = grid.card_at(idx)?.id;
        app.grid_state.select(Some(idx));
        app.double_click.reset();
        let gesture = if on_info_column(app.hit.grid, column) {
            CardGesture::Info
        } else {
            CardGesture::Click
        };
        return gesture_command(CardPanel::Grid, gesture, id);
    }

    if let Some(idx) = row_index(app.hit.selected, &app.selected_state, column, row) {
        app.focus = Focus::Selected;
        let list = project_selected(&app.selection);
        let id = list.card_at(idx)?.id;
        app.selected_state.select(Some(idx));
        let gesture = if on_info_column(app.hit.selected, column) {
            CardGesture::Info
        } else {
            app.double_click.classify(CardPanel::Selected, id, now)
        };
        return gesture_command(CardPanel::Selected, gesture, id);
    }

    None
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

/// Index of the list row under the pointer, inside the bordered area.
fn row_index(area: Rect, state: &ListState, column: u16, row: u16) -> Option<usize> {
    if area.width < 3 || area.height < 3 || !contains(area, column, row) {
        return None;
    }
    let inner_top = area.y + 1;
    let inner_bottom = area.y + area.height - 1;
    let inner_left = area.x + 1;
    let inner_right = area.x + area.width - 1;
    if row < inner_top || row >= inner_bottom || column < inner_left || column >= inner_right {
        return None;
    }
    Some(state.offset() + (row - inner_top) as usize)
}

fn on_info_column(area: Rect, column: u16) -> bool {
    let inner_right = area.x + area.width.saturating_sub(1);
    column >= inner_right.saturating_sub(INFO_COLUMNS)
}

fn move_cursor(state: &mut ListState, len: usize, delta: i64) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as i64;
    let next = (current + delta).clamp(0, len as i64 - 1);
    state.select(Some(next as usize));
}
