use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::shell::Panel;
use crate::tui::{self, AppEvent};

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(columns, rows) => {
            app.shell.on_resize(tui::viewport_after_resize(columns, rows))
        }
        AppEvent::Tick => app.tick_animation(),
        AppEvent::ChatSettled(outcome) => app.settle_chat(outcome),
        AppEvent::UploadProgress { ticket, loaded, total } => {
            app.record_upload_progress(ticket, loaded, total)
        }
        AppEvent::UploadSettled { ticket, outcome } => app.settle_upload(ticket, outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        app.should_quit = true;
        return;
    }

    // Modal overlays take the keyboard first
    if app.picker.is_some() {
        handle_picker(app, key);
        return;
    }
    if app.shell.mobile_menu_visible() {
        handle_mobile_menu(app, key);
        return;
    }

    let handled = match key.code {
        KeyCode::F(n @ 1..=3) => {
            if let Some(panel) = Panel::from_index(usize::from(n - 1)) {
                app.shell.set_active_panel(panel);
            }
            true
        }
        KeyCode::F(4) => {
            app.shell.toggle_menu();
            true
        }
        KeyCode::Tab => {
            let next = app.shell.active_panel().next();
            app.shell.set_active_panel(next);
            true
        }
        KeyCode::BackTab => {
            let previous = app.shell.active_panel().previous();
            app.shell.set_active_panel(previous);
            true
        }
        _ => false,
    };
    if handled {
        return;
    }

    match app.shell.active_panel() {
        Panel::Chat => handle_chat(app, key),
        Panel::Dashboard => handle_dashboard(app, key),
        Panel::Upload => handle_upload(app, key),
    }
}

/// Keys shared by the panels that have no text input.
fn handle_navigation_keys(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('m') => app.shell.toggle_menu(),
        KeyCode::Char(c @ '1'..='3') => {
            let index = c as usize - '1' as usize;
            if let Some(panel) = Panel::from_index(index) {
                app.shell.set_active_panel(panel);
            }
        }
        _ => return false,
    }
    true
}

fn handle_mobile_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.shell.menu_down(),
        KeyCode::Char('k') | KeyCode::Up => app.shell.menu_up(),
        KeyCode::Enter => app.shell.menu_select(),
        KeyCode::Esc | KeyCode::Char('m') | KeyCode::F(4) => app.shell.toggle_menu(),
        KeyCode::F(n @ 1..=3) => {
            if let Some(panel) = Panel::from_index(usize::from(n - 1)) {
                app.shell.set_active_panel(panel);
            }
        }
        _ => {}
    }
}

fn handle_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_picker(),
        KeyCode::Enter => app.confirm_picker(),
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(picker) = app.picker.as_mut() {
                picker.nav_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(picker) = app.picker.as_mut() {
                picker.nav_up();
            }
        }
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        // Shift/Alt+Enter adds a line break instead of sending
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.chat.insert_newline();
        }
        KeyCode::Enter => app.submit_chat(),
        KeyCode::Backspace => app.chat.backspace(),
        KeyCode::Delete => app.chat.delete(),
        KeyCode::Left => app.chat.cursor_left(),
        KeyCode::Right => app.chat.cursor_right(),
        KeyCode::Home => app.chat.cursor_home(),
        KeyCode::End => app.chat.cursor_end(),
        KeyCode::PageUp => app.conversation.page_up(),
        KeyCode::PageDown => app.conversation.page_down(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.chat.insert_char(c);
        }
        _ => {}
    }
}

fn handle_dashboard(app: &mut App, key: KeyEvent) {
    if handle_navigation_keys(app, key) {
        return;
    }
    if key.code == KeyCode::Char('o') {
        app.open_dashboard();
    }
}

fn handle_upload(app: &mut App, key: KeyEvent) {
    if handle_navigation_keys(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('b') => app.open_picker(),
        KeyCode::Char('u') | KeyCode::Enter => app.start_upload(),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.shell.active_panel() {
        // A file dropped on the upload panel selects it; it never lands in a text field
        Panel::Upload => app.drop_paths(&parse_dropped_paths(text)),
        Panel::Chat => app.chat.insert_str(text),
        Panel::Dashboard => {}
    }
}

/// Splits pasted text into file paths the way terminals emit dropped files:
/// whitespace separated, with quotes or backslash escapes around spaces, and
/// sometimes as `file://` URLs.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.trim().chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => quote = Some(c),
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .map(|token| match token.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(token),
        })
        .collect()
}
