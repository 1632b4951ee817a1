use crossterm::event::{KeyCode, KeyEvent};

use crate::tui::app::{App, Mode};
use crate::view::Focus;

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    if app.dashboard.focus() == Focus::Detail && handle_detail(app, key) {
        return;
    }

    let page = app.tree_height.max(1) as isize;
    let d = &mut app.dashboard;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('j') | KeyCode::Down => d.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => d.move_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => d.select_first(),
        KeyCode::Char('G') | KeyCode::End => d.select_last(),
        KeyCode::PageDown => d.move_cursor(page),
        KeyCode::PageUp => d.move_cursor(-page),

        KeyCode::Char(' ') | KeyCode::Enter => d.toggle_selected(),
        KeyCode::Char('l') | KeyCode::Right => d.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => d.collapse_selected(),
        KeyCode::Char('E') => d.expand_all(),

        KeyCode::Char('/') => {
            app.prompt = d.filter().text.clone();
            app.prompt_saved = app.prompt.clone();
            app.mode = Mode::Filter;
        }
        KeyCode::Char('v') => d.cycle_view_mode(),
        KeyCode::Char('r') => d.force_refresh(),

        KeyCode::Char('n') => {
            app.create_parent = d.selected_node().map(|n| n.id().to_string());
            app.prompt.clear();
            app.mode = Mode::Create;
        }
        KeyCode::Char('N') => {
            app.create_parent = None;
            app.prompt.clear();
            app.mode = Mode::Create;
        }

        KeyCode::Char('o') => app.toggle_detail(),
        KeyCode::Tab => d.toggle_focus(),
        KeyCode::Esc => {
            if !d.dismiss_notices() && d.filter().is_active() {
                d.clear_filter();
            }
        }
        _ => {}
    }
}

/// Keys that act on the detail pane while it has focus. Returns false for
/// keys the tree should handle.
fn handle_detail(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.detail_scroll = app.detail_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.detail_scroll = app.detail_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') | KeyCode::Home => app.detail_scroll = 0,
        KeyCode::Tab | KeyCode::Esc => app.dashboard.set_focus(Focus::Tree),
        _ => return false,
    }
    true
}
