use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Reply(result) => app.on_reply(result),
        AppEvent::Downloaded(result) => app.on_downloaded(result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Char('/') => start_editing(app),
        KeyCode::Tab => app.next_focus(),
        KeyCode::Char('b') => app.toggle_sidebar(),
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1))
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1))
        }
        _ => match app.focus {
            FocusPane::Chat => handle_chat_keys(app, key),
            FocusPane::Options => handle_options_keys(app, key),
            FocusPane::Sidebar => {
                if key.code == KeyCode::Enter {
                    app.new_conversation();
                }
            }
        },
    }
}

fn handle_chat_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),
        KeyCode::Char('g') => {
            app.chat_scroll = 0;
            app.follow_bottom = false;
        }
        KeyCode::Char('G') => app.follow_bottom = true,
        KeyCode::Char('c') => app.copy_selected(),
        KeyCode::Char('d') => app.download_selected(),
        KeyCode::Enter => start_editing(app),
        _ => {}
    }
}

fn handle_options_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.options_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.options_nav_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.select_highlighted_option(),
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            app.select_option(index);
        }
        KeyCode::Esc => app.focus = FocusPane::Chat,
        _ => {}
    }
}

fn start_editing(app: &mut App) {
    // The input box is locked while a request is outstanding
    if app.conversation.is_busy() {
        return;
    }
    app.input_mode = InputMode::Editing;
    app.focus = FocusPane::Chat;
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        _ if app.conversation.is_busy() => {}
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let input = app.conversation.input_mut();
                let byte_pos = char_to_byte_index(input, app.input_cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let input = app.conversation.input_mut();
            if app.input_cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, app.input_cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.conversation.input().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.conversation.input().chars().count();
        }
        KeyCode::Char(c) => {
            let input = app.conversation.input_mut();
            let byte_pos = char_to_byte_index(input, app.input_cursor);
            input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Index of the visible option row under `y`, skipping the list's borders
fn option_row_at(area: Rect, y: u16) -> Option<usize> {
    let row = y.checked_sub(area.y + 1)?;
    (row < area.height.saturating_sub(2)).then_some(row as usize)
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_options = app.options_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_options {
                app.options_nav_down();
            } else if in_chat {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_options {
                app.options_nav_up();
            } else if in_chat {
                app.scroll_up(3);
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if in_options {
                if let Some(row) = app.options_area.and_then(|area| option_row_at(area, y)) {
                    app.select_option(app.option_state.offset() + row);
                }
            } else if in_sidebar {
                app.new_conversation();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use lvc_core::ChatResponse;

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("ação", 0), 0);
        assert_eq!(char_to_byte_index("ação", 2), 3);
        assert_eq!(char_to_byte_index("ação", 10), 6);
    }

    #[test]
    fn test_editing_handles_multibyte_input() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "Erosões");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);

        assert_eq!(app.conversation.input(), "rosõs");
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);

        assert!(!app.conversation.has_started());
        assert!(!app.conversation.is_busy());
        assert_eq!(app.conversation.input(), "   ");
    }

    #[tokio::test]
    async fn test_enter_submits_and_locks_input() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "arraial");
        press(&mut app, KeyCode::Enter);

        assert!(app.conversation.is_busy());
        assert_eq!(app.conversation.input(), "");
        assert_eq!(app.input_cursor, 0);

        // Typing is ignored until the reply arrives
        type_text(&mut app, "xyz");
        assert_eq!(app.conversation.input(), "");

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event).unwrap();
        assert!(!app.conversation.is_busy());
        assert_eq!(app.conversation.history().len(), 2);
    }

    #[test]
    fn test_number_keys_pick_options() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);
        handle_event(
            &mut app,
            AppEvent::Reply(Ok(ChatResponse::choose("?", vec!["a.pdf".into()]))),
        )
        .unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.focus, FocusPane::Options);

        // Out of range: nothing is sent
        press(&mut app, KeyCode::Char('2'));
        assert!(!app.conversation.is_busy());
    }

    fn click(app: &mut App, column: u16, row: u16) {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };
        handle_event(app, AppEvent::Mouse(mouse)).unwrap();
    }

    #[test]
    fn test_option_row_at() {
        let area = Rect::new(0, 10, 40, 4);
        assert_eq!(option_row_at(area, 10), None);
        assert_eq!(option_row_at(area, 11), Some(0));
        assert_eq!(option_row_at(area, 12), Some(1));
        assert_eq!(option_row_at(area, 13), None);
    }

    #[tokio::test]
    async fn test_click_on_options_border_sends_nothing() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(ChatResponse::choose(
            "?",
            vec!["a.pdf".into(), "b.pdf".into()],
        )));
        app.options_area = Some(Rect::new(0, 10, 40, 4));

        click(&mut app, 5, 10);
        click(&mut app, 5, 13);
        assert!(!app.conversation.is_busy());

        click(&mut app, 5, 12);
        assert!(app.conversation.is_busy());
        assert_eq!(app.conversation.history().len(), 2);
    }

    #[test]
    fn test_new_conversation_key() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("x");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(ChatResponse::answer("ok", None)));

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('n'));

        assert!(!app.conversation.has_started());
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_quit() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
