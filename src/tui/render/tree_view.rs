use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use regex::Regex;

use crate::model::Status;
use crate::tui::app::App;
use crate::util::unicode::{display_width, truncate_to_width};
use crate::view::{Focus, TreeRow};

use super::{filter_regex, push_highlighted_spans};

/// Status glyph for an issue
pub(super) fn status_symbol(status: Status, blocked: bool) -> &'static str {
    match status {
        Status::Closed => "\u{2713}",          // ✓
        Status::InProgress => "\u{25D0}",      // ◐
        Status::Open if blocked => "\u{2298}", // ⊘
        Status::Open => "\u{25CB}",            // ○
    }
}

/// Tree-drawing facts for one row
#[derive(Debug, Clone, PartialEq, Eq)]
struct Branch {
    /// No later sibling under the same parent occurrence
    last: bool,
    /// Per shallower level, whether that ancestor has a later sibling
    continues: Vec<bool>,
}

/// Compute branch glyph facts for every row in one backwards pass
fn branches(rows: &[TreeRow]) -> Vec<Branch> {
    let mut out = Vec::with_capacity(rows.len());
    let mut later: Vec<bool> = Vec::new();
    for row in rows.iter().rev() {
        let d = row.depth;
        if later.len() <= d {
            later.resize(d + 1, false);
        }
        out.push(Branch {
            last: !later[d],
            continues: later[..d].to_vec(),
        });
        later[d] = true;
        later.truncate(d + 1);
    }
    out.reverse();
    out
}

/// Render the outline into `area`, scrolling to keep the cursor visible
pub fn render_tree_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let visible_height = area.height as usize;
    app.tree_height = visible_height;
    app.dashboard.scroll_to_cursor(visible_height);

    let bg = app.theme.background;
    let rows = app.dashboard.rows();
    if rows.is_empty() {
        let line = if app.dashboard.filter().is_active() {
            let warn_style = Style::default()
                .fg(app.theme.text_bright)
                .bg(app.theme.alert_bg)
                .add_modifier(Modifier::BOLD);
            Line::from(vec![
                Span::styled(" ", Style::default().bg(bg)),
                Span::styled(" no matching issues ", warn_style),
            ])
        } else {
            Line::from(Span::styled(
                " No issues",
                Style::default().fg(app.theme.muted).bg(bg),
            ))
        };
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(bg)), area);
        return;
    }

    let branches = branches(rows);
    let scroll = app.dashboard.view().scroll_offset;
    let end = rows.len().min(scroll + visible_height);
    let search_re = filter_regex(&app.dashboard.filter().text);
    let cursor = app.dashboard.cursor();
    let tree_focused = app.dashboard.focus() == Focus::Tree;

    let lines: Vec<Line> = (scroll..end)
        .map(|i| {
            render_row(
                app,
                i,
                &branches[i],
                i == cursor,
                tree_focused,
                area.width as usize,
                search_re.as_ref(),
            )
        })
        .collect();

    let paragraph = Paragraph::new(lines).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

fn render_row(
    app: &App,
    index: usize,
    branch: &Branch,
    is_cursor: bool,
    tree_focused: bool,
    width: usize,
    search_re: Option<&Regex>,
) -> Line<'static> {
    let theme = &app.theme;
    let dashboard = &app.dashboard;
    let row = dashboard.rows()[index];
    let node = dashboard.graph().node(row.node);
    let issue = &node.issue;

    let context = dashboard.filter().is_active() && !row.matched;
    let closed = issue.status == Status::Closed;
    let row_bg = if is_cursor {
        theme.selection_bg
    } else {
        theme.background
    };
    let dim = Style::default().fg(theme.muted).bg(row_bg);

    let mut spans: Vec<Span<'static>> = Vec::new();

    // Column 0: cursor bar
    if is_cursor && tree_focused {
        spans.push(Span::styled(
            "\u{258E}",
            Style::default().fg(theme.selection_bar).bg(row_bg),
        ));
    } else {
        spans.push(Span::styled(" ", Style::default().bg(row_bg)));
    }

    // Guides and branch
    for continues in branch.continues.iter().skip(1) {
        spans.push(Span::styled(
            if *continues { "\u{2502} " } else { "  " },
            dim,
        ));
    }
    if row.depth > 0 {
        let tree_char = if branch.last { "\u{2514}" } else { "\u{251C}" }; // └ / ├
        spans.push(Span::styled(tree_char, dim));
    }
    let expand_char = match (row.has_children, row.expanded) {
        (true, true) => "\u{25BC}",  // ▼
        (true, false) => "\u{25B6}", // ▶
        (false, _) => " ",
    };
    spans.push(Span::styled(expand_char, dim));
    spans.push(Span::styled(" ", dim));

    // Status and priority
    let status_color = if context {
        theme.muted
    } else {
        theme.status_color(issue.status, node.is_blocked)
    };
    let mut status_style = Style::default().fg(status_color).bg(row_bg);
    if is_cursor {
        status_style = status_style.add_modifier(Modifier::BOLD);
    }
    spans.push(Span::styled(
        status_symbol(issue.status, node.is_blocked),
        status_style,
    ));
    spans.push(Span::styled(" ", dim));
    let priority_color = if context || closed {
        theme.muted
    } else {
        theme.priority_color(issue.priority)
    };
    spans.push(Span::styled(
        format!("P{} ", issue.priority),
        Style::default().fg(priority_color).bg(row_bg),
    ));

    let highlight = Style::default()
        .fg(theme.match_fg)
        .bg(theme.match_bg)
        .add_modifier(Modifier::BOLD);
    let search_re = search_re.filter(|_| row.matched);

    // ID
    let id_style = if context || closed {
        dim
    } else {
        Style::default().fg(theme.text).bg(row_bg)
    };
    push_highlighted_spans(&mut spans, &issue.id, id_style, highlight, search_re);
    spans.push(Span::styled(" ", dim));

    // Trailing markers, measured before the title so the title can yield
    let mut markers: Vec<Span<'static>> = Vec::new();
    if row.has_children && !row.expanded {
        if node.has_in_progress && issue.status != Status::InProgress {
            markers.push(Span::styled(
                " \u{25C6}", // ◆
                Style::default().fg(theme.accent).bg(row_bg),
            ));
        } else if node.has_ready && !node.is_ready() {
            markers.push(Span::styled(
                " \u{25C7}", // ◇
                Style::default().fg(theme.ok).bg(row_bg),
            ));
        }
    }
    if row.multi_parent {
        markers.push(Span::styled(format!(" \u{00D7}{}", node.parents.len()), dim));
    }

    // Title
    let used: usize = spans.iter().map(|s| display_width(&s.content)).sum();
    let marker_width: usize = markers.iter().map(|s| display_width(&s.content)).sum();
    let available = width.saturating_sub(used + marker_width);
    let title = truncate_to_width(&issue.title, available);
    let title_style = if context || closed {
        dim
    } else if is_cursor {
        Style::default()
            .fg(theme.text_bright)
            .bg(row_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_bright).bg(row_bg)
    };
    push_highlighted_spans(&mut spans, &title, title_style, highlight, search_re);
    spans.extend(markers);

    // Fill the rest of the cursor row with the selection background
    if is_cursor {
        let used: usize = spans.iter().map(|s| display_width(&s.content)).sum();
        if used < width {
            spans.push(Span::styled(
                " ".repeat(width - used),
                Style::default().bg(row_bg),
            ));
        }
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;
    use crate::tui::render::test_helpers::{TERM_W, app_with, render_to_string};
    use insta::assert_snapshot;

    fn outline() -> Vec<Issue> {
        vec![
            Issue::new("bd-1", "Parser epic").with_priority(1),
            Issue::new("bd-2", "Lexer")
                .child_of("bd-1")
                .with_status(Status::InProgress),
            Issue::new("bd-3", "Token table").child_of("bd-1"),
            Issue::new("bd-4", "Keywords").child_of("bd-3"),
            Issue::new("bd-5", "Docs")
                .with_priority(3)
                .with_status(Status::Closed),
        ]
    }

    #[test]
    fn draws_guides_and_branches() {
        let mut app = app_with(outline());
        app.dashboard.expand_all();
        let output = render_to_string(40, 6, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        assert_snapshot!(output, @r"
        ▎▼ ○ P1 bd-1 Parser epic
         ├  ◐ P2 bd-2 Lexer
         └▼ ○ P2 bd-3 Token table
           └  ○ P2 bd-4 Keywords
           ✓ P3 bd-5 Docs
        ");
    }

    #[test]
    fn collapsed_parent_shows_in_progress_marker() {
        let mut app = app_with(outline());
        // bd-1 opens by default around its in-progress child
        assert!(app.dashboard.selected_row().unwrap().expanded);
        app.dashboard.collapse_selected();
        let output = render_to_string(TERM_W, 4, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        let first = output.lines().next().unwrap();
        assert!(first.contains("\u{25B6}"), "collapsed glyph: {first}");
        assert!(first.ends_with("Parser epic \u{25C6}"), "marker: {first}");
        assert!(!output.contains("bd-2"));
    }

    #[test]
    fn long_titles_are_truncated() {
        let mut app = app_with(vec![Issue::new(
            "bd-1",
            "A very long title that cannot possibly fit",
        )]);
        let output = render_to_string(30, 2, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        assert!(output.lines().next().unwrap().ends_with('\u{2026}'));
    }

    #[test]
    fn shared_child_is_marked_under_each_parent() {
        let mut app = app_with(vec![
            Issue::new("e1", "One"),
            Issue::new("e2", "Two"),
            Issue::new("t", "Shared").child_of("e1").child_of("e2"),
        ]);
        app.dashboard.expand_all();
        let output = render_to_string(TERM_W, 6, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        assert_eq!(output.matches("Shared \u{00D7}2").count(), 2);
    }

    #[test]
    fn empty_filter_result_says_so() {
        let mut app = app_with(outline());
        app.dashboard.set_filter_text("nothing matches this");
        let output = render_to_string(TERM_W, 3, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        assert!(output.contains("no matching issues"));
    }

    #[test]
    fn scrolls_to_keep_the_cursor_visible() {
        let issues = (0..20)
            .map(|i| Issue::new(format!("bd-{i:02}"), format!("Issue {i}")))
            .collect();
        let mut app = app_with(issues);
        app.dashboard.select_last();
        let output = render_to_string(TERM_W, 5, |frame, area| {
            render_tree_view(frame, &mut app, area);
        });
        assert!(output.contains("bd-19"));
        assert!(!output.contains("bd-00"));
        assert_eq!(app.tree_height, 5);
    }

    #[test]
    fn branch_facts_follow_siblings() {
        let mut app = app_with(outline());
        app.dashboard.expand_all();
        let got: Vec<(bool, Vec<bool>)> = branches(app.dashboard.rows())
            .into_iter()
            .map(|b| (b.last, b.continues))
            .collect();
        assert_eq!(
            got,
            vec![
                (false, vec![]),
                (false, vec![true]),
                (true, vec![true]),
                (true, vec![true, false]),
                (true, vec![]),
            ]
        );
    }
}
