use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, LineInput};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.on_tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Query => handle_query_editing(app, key),
        InputMode::UploadPath => handle_path_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('u') => app.open_upload_prompt(),
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => app.open_query_input(),

        // Message selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),
        KeyCode::Char('c') | KeyCode::Char('y') => app.copy_selected(),

        // Scrolling
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,

        _ => {}
    }
}

fn handle_query_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_query(),
        _ => edit_line(&mut app.query_input, key),
    }
}

fn handle_path_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.start_upload(),
        _ => edit_line(&mut app.path_input, key),
    }
}

fn edit_line(input: &mut LineInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => input.clear(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => {}
    }
}

/// Pasted text goes into whichever field is open. In normal mode a paste is
/// taken as a file dropped onto the terminal and opens the upload prompt.
fn handle_paste(app: &mut App, text: &str) {
    match app.input_mode {
        InputMode::Query => app.query_input.insert_str(text),
        InputMode::UploadPath => app.path_input.insert_str(text),
        InputMode::Normal => {
            app.open_upload_prompt();
            if app.input_mode == InputMode::UploadPath {
                app.path_input.clear();
                app.path_input.insert_str(text.trim());
            }
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_edit_line_keys() {
        let mut input = LineInput::default();
        for c in "report.pdf".chars() {
            edit_line(&mut input, key(KeyCode::Char(c)));
        }
        edit_line(&mut input, key(KeyCode::Home));
        edit_line(&mut input, key(KeyCode::Delete));
        assert_eq!(input.text, "eport.pdf");

        edit_line(&mut input, key(KeyCode::End));
        edit_line(&mut input, key(KeyCode::Backspace));
        assert_eq!(input.text, "eport.pd");

        edit_line(&mut input, ctrl('u'));
        assert!(input.is_empty());
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn test_unbound_ctrl_chords_do_not_type() {
        let mut input = LineInput::default();
        edit_line(&mut input, ctrl('a'));
        edit_line(&mut input, ctrl('e'));
        assert!(input.is_empty());

        let shifted = KeyEvent {
            code: KeyCode::Char('R'),
            modifiers: KeyModifiers::SHIFT,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        edit_line(&mut input, shifted);
        assert_eq!(input.text, "R");
    }
}
