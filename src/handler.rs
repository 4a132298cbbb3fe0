use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{App, InputMode};
use crate::event::AppEvent;

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
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Backend(event) => app.apply_backend(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Overlays swallow all other keys
    if app.notice.is_some() {
        handle_notice(app, key);
        return;
    }
    if app.viewer.is_open() {
        handle_viewer(app, key);
        return;
    }

    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        request_reindex(app);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_notice(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
        app.dismiss_notice();
    }
}

fn handle_viewer(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.viewer.close(),
        KeyCode::Left | KeyCode::Char('h') if app.viewer.has_navigation() => app.viewer.prev(),
        KeyCode::Right | KeyCode::Char('l') if app.viewer.has_navigation() => app.viewer.next(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.viewer.zoom_in(),
        KeyCode::Char('-') => app.viewer.zoom_out(),
        KeyCode::Char('0') => app.viewer.reset_zoom(),
        KeyCode::Char('y') => {
            if let Some(reference) = app.viewer.current() {
                let location = app.image_location(reference);
                app.copy_to_clipboard(&location);
            }
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Char('a') => {
            app.input_mode = InputMode::Editing;
            app.selected_image = None;
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height.max(2) / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height.max(2) / 2);
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Image thumbnails
        KeyCode::Tab => app.select_next_image(),
        KeyCode::BackTab => app.select_prev_image(),
        KeyCode::Enter | KeyCode::Char('o') => app.open_selected_image(),

        KeyCode::Char('r') => request_reindex(app),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.select_next_image();
        }
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            insert_char(app, '\n');
        }
        KeyCode::Enter => {
            if let Err(reason) = app.submit() {
                debug!(?reason, "submission refused");
            }
        }
        KeyCode::Backspace => {
            if app.input_enabled() && app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_enabled() && app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => insert_char(app, c),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    if !app.input_enabled() {
        return;
    }
    let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
    app.input.insert(byte_pos, c);
    app.input_cursor += 1;
}

fn request_reindex(app: &mut App) {
    if let Err(reason) = app.trigger_reindex() {
        debug!(?reason, "reindex refused");
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    if app.notice.is_some() {
        return;
    }
    if app.viewer.is_open() {
        // Clicking the backdrop dismisses the overlay
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let inside = app.viewer_area.is_some_and(|r| point_in_rect(x, y, r));
            if !inside {
                app.viewer.close();
            }
        }
        return;
    }

    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));
    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(3),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event;
    use crate::state::Message;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn offline_app() -> App {
        let config = Config {
            backend_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let (tx, _rx) = event::channel();
        App::new(config, tx).unwrap()
    }

    #[test]
    fn char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn typing_edits_at_cursor() {
        let mut app = offline_app();
        for c in "helo".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).unwrap();
        }
        handle_event(&mut app, key(KeyCode::Left)).unwrap();
        handle_event(&mut app, key(KeyCode::Char('l'))).unwrap();
        assert_eq!(app.input, "hello");

        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Delete)).unwrap();
        assert_eq!(app.input, "ello");

        let newline = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::ALT,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        handle_event(&mut app, key(KeyCode::End)).unwrap();
        handle_event(&mut app, AppEvent::Key(newline)).unwrap();
        assert_eq!(app.input, "ello\n");
    }

    #[tokio::test]
    async fn blank_enter_sends_nothing() {
        let mut app = offline_app();
        handle_event(&mut app, key(KeyCode::Char(' '))).unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.conversation.is_empty());
        assert!(!app.chat.is_pending());
    }

    #[tokio::test]
    async fn viewer_keys_and_backdrop_click() {
        let mut app = offline_app();
        app.conversation.push(Message::assistant(
            "look",
            Some(vec!["/x.png".to_string(), "/y.png".to_string()]),
        ));

        handle_event(&mut app, key(KeyCode::Tab)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.viewer.current(), Some("/x.png"));

        handle_event(&mut app, key(KeyCode::Char('+'))).unwrap();
        handle_event(&mut app, key(KeyCode::Char('+'))).unwrap();
        assert_eq!(app.viewer.zoom_percent(), Some(150));
        handle_event(&mut app, key(KeyCode::Left)).unwrap();
        assert_eq!(app.viewer.current(), Some("/y.png"));
        assert_eq!(app.viewer.zoom_percent(), Some(100));

        // 'q' closes the overlay instead of quitting
        handle_event(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(!app.viewer.is_open());
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Char('o'))).unwrap();
        app.viewer_area = Some(Rect::new(10, 5, 20, 10));
        handle_event(&mut app, click(12, 6)).unwrap();
        assert!(app.viewer.is_open());
        handle_event(&mut app, click(0, 0)).unwrap();
        assert!(!app.viewer.is_open());
    }

    #[tokio::test]
    async fn notice_blocks_other_keys_until_dismissed() {
        let mut app = offline_app();
        app.notice = Some(crate::app::Notice {
            success: true,
            message: "done".to_string(),
        });
        handle_event(&mut app, key(KeyCode::Char('x'))).unwrap();
        assert!(app.input.is_empty());
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.notice, None);
    }
}
