use crossterm::event::{KeyCode, KeyEvent};

use crate::io::create::NewIssue;
use crate::tui::app::{App, Mode};
use crate::util::unicode::pop_grapheme;

/// Keys for the single-line filter and create prompts
pub(super) fn handle_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.mode == Mode::Filter {
                let saved = std::mem::take(&mut app.prompt_saved);
                app.dashboard.set_filter_text(&saved);
            }
            finish(app);
        }
        KeyCode::Enter => {
            if app.mode == Mode::Create {
                submit_create(app);
            }
            finish(app);
        }
        KeyCode::Backspace => {
            pop_grapheme(&mut app.prompt);
            live_filter(app);
        }
        KeyCode::Char(c) => {
            app.prompt.push(c);
            live_filter(app);
        }
        _ => {}
    }
}

fn live_filter(app: &mut App) {
    if app.mode == Mode::Filter {
        app.dashboard.set_filter_text(&app.prompt);
    }
}

fn submit_create(app: &mut App) {
    let title = app.prompt.trim();
    if title.is_empty() {
        return;
    }
    app.outbox.push(NewIssue {
        title: title.to_string(),
        parent: app.create_parent.take(),
    });
}

fn finish(app: &mut App) {
    app.mode = Mode::Navigate;
    app.prompt.clear();
    app.prompt_saved.clear();
    app.create_parent = None;
}
