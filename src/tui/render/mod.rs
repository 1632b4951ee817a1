pub mod detail_view;
pub mod status_row;
pub mod tree_view;

#[cfg(test)]
pub(crate) mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;
use regex::Regex;

use super::app::App;

/// Draw one frame: outline, optional detail pane, notice and status rows
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: content | notice (only when present) | status row
    let notice_height = u16::from(!app.dashboard.notices().is_empty());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(notice_height),
            Constraint::Length(1),
        ])
        .split(area);

    let content = chunks[0];
    if app.dashboard.detail_node().is_some() && content.width >= 60 {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(content);
        tree_view::render_tree_view(frame, app, columns[0]);
        detail_view::render_detail_view(frame, app, columns[1]);
    } else {
        tree_view::render_tree_view(frame, app, content);
    }

    if notice_height > 0 {
        status_row::render_notice_row(frame, app, chunks[1]);
    }
    status_row::render_status_row(frame, app, chunks[2]);
}

/// Case-insensitive literal matcher for the active filter text
pub(super) fn filter_regex(text: &str) -> Option<Regex> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", regex::escape(text))).ok()
}

/// Push spans for text with regex match highlighting. If no regex or no matches,
/// pushes a single span with `base_style`. Otherwise splits text at match boundaries.
pub(super) fn push_highlighted_spans<'a>(
    spans: &mut Vec<Span<'a>>,
    text: &str,
    base_style: Style,
    highlight_style: Style,
    search_re: Option<&Regex>,
) {
    let Some(re) = search_re else {
        spans.push(Span::styled(text.to_string(), base_style));
        return;
    };

    let mut last_end = 0;
    for m in re.find_iter(text) {
        if m.start() > last_end {
            spans.push(Span::styled(
                text[last_end..m.start()].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(m.as_str().to_string(), highlight_style));
        last_end = m.end();
    }
    if last_end < text.len() || text.is_empty() {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn highlights_every_case_insensitive_match() {
        let re = filter_regex("lex").unwrap();
        let base = Style::default();
        let hit = Style::default().bg(Color::Cyan);
        let mut spans = Vec::new();
        push_highlighted_spans(&mut spans, "Lexer and lexicon", base, hit, Some(&re));
        let parts: Vec<(&str, bool)> = spans
            .iter()
            .map(|s| (s.content.as_ref(), s.style == hit))
            .collect();
        assert_eq!(
            parts,
            vec![
                ("Lex", true),
                ("er and ", false),
                ("lex", true),
                ("icon", false)
            ]
        );
    }

    #[test]
    fn full_screen_shows_tree_detail_notice_and_status() {
        use crate::dashboard::NoticeKind;
        use crate::model::Issue;
        use test_helpers::{TERM_H, TERM_W, app_with, render_to_string};

        let mut app = app_with(vec![
            Issue::new("bd-1", "Parser epic"),
            Issue::new("bd-2", "Lexer").child_of("bd-1"),
        ]);
        app.dashboard
            .notify(NoticeKind::Warning, "inserting bd-2 took 80ms");
        let output = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &mut app));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), TERM_H as usize);
        assert!(lines[0].contains("bd-1 Parser epic"));
        assert!(output.contains("Comments"));
        assert!(lines[22].contains("warning: inserting bd-2 took 80ms"));
        assert!(lines[23].starts_with(" [all]"));
        assert_eq!(app.tree_height, 22);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let re = filter_regex("a.b").unwrap();
        assert!(re.is_match("A.B"));
        assert!(!re.is_match("axb"));
        assert!(filter_regex("   ").is_none());
    }
}
