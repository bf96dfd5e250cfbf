use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tui_input::backend::crossterm::to_input_request;

use crate::app::{App, Mode};

/// Handle key event and update app state
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C quits from any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.mode() {
        Mode::Normal => handle_normal_mode(app, key),
        Mode::EditUrl => handle_edit_mode(app, key),
        Mode::CookiePrompt => handle_cookie_mode(app, key),
    }
}

/// Handle bracketed paste from the terminal
pub fn handle_paste(app: &mut App, text: String) {
    match app.mode() {
        // Pasting over the URL field replaces its contents, like the
        // original paste button did
        Mode::Normal => app.set_url(single_line(&text)),
        Mode::EditUrl => {
            for ch in single_line(&text).chars() {
                app.url_mut()
                    .handle(tui_input::InputRequest::InsertChar(ch));
            }
        }
        // Cookie files are multi-line; take the paste verbatim
        Mode::CookiePrompt => app.cookie_entry_mut().push_str(&text),
    }
}

/// URLs never span lines; drop any terminators a paste carries
fn single_line(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Handle key event in Normal mode
fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),

        // URL editing
        KeyCode::Char('e') | KeyCode::Char('i') => app.set_mode(Mode::EditUrl),

        // Download control
        KeyCode::Enter => app.start_download(),
        KeyCode::Char('x') => app.cancel_download(),

        // Selection cycling
        KeyCode::Char('o') => app.cycle_preset(),
        KeyCode::Char('b') => app.cycle_cookie_source(),

        // Vertical scroll (j/k)
        KeyCode::Char('j') | KeyCode::Down => app.view_mut().scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.view_mut().scroll_up(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.view_mut().scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.view_mut().scroll_half_page_up();
        }

        // Jump to top/bottom
        KeyCode::Char('g') => app.view_mut().scroll_to_top(),
        KeyCode::Char('G') => app.view_mut().scroll_to_bottom(),

        // Toggle follow
        KeyCode::Char('f') => app.view_mut().toggle_auto_scroll(),

        _ => {}
    }
}

/// Handle key event while editing the URL
fn handle_edit_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.set_mode(Mode::Normal),

        // Enter starts the download straight from the field
        KeyCode::Enter => {
            app.set_mode(Mode::Normal);
            app.start_download();
        }

        // Delegate to tui-input for text editing (Emacs-like keybindings)
        _ => {
            if let Some(req) = to_input_request(&Event::Key(key)) {
                app.url_mut().handle(req);
            }
        }
    }
}

/// Handle key event in the cookie prompt
fn handle_cookie_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_cookie_prompt(),
        KeyCode::Enter => app.submit_cookies(),
        KeyCode::Backspace => {
            app.cookie_entry_mut().pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.cookie_entry_mut().clear();
        }
        KeyCode::Char(c) => app.cookie_entry_mut().push(c),
        _ => {}
    }
}
