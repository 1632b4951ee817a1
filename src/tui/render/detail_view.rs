use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::graph::{Graph, Node, NodeId};
use crate::model::Status;
use crate::tui::app::App;
use crate::tui::theme::Theme;
use crate::view::Focus;

use super::tree_view::status_symbol;

/// Render the detail pane for the issue the dashboard has open
pub fn render_detail_view(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let bg = theme.background;
    let border_color = if app.dashboard.focus() == Focus::Detail {
        theme.selection_bar
    } else {
        theme.muted
    };
    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(border_color).bg(bg))
        .style(Style::default().bg(bg));

    let Some(node) = app.dashboard.detail_node() else {
        let empty = Paragraph::new(" Issue not found")
            .style(Style::default().fg(theme.muted).bg(bg))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let lines = detail_lines(theme, app.dashboard.graph(), node);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn detail_lines(theme: &Theme, graph: &Graph, node: &Node) -> Vec<Line<'static>> {
    let bg = theme.background;
    let text = Style::default().fg(theme.text).bg(bg);
    let bright = Style::default().fg(theme.text_bright).bg(bg);
    let dim = Style::default().fg(theme.muted).bg(bg);
    let header = Style::default()
        .fg(theme.accent)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let issue = &node.issue;

    let mut lines: Vec<Line<'static>> = Vec::new();

    // Title
    lines.push(Line::from(vec![
        Span::styled(" ", bright),
        Span::styled(
            status_symbol(issue.status, node.is_blocked),
            Style::default()
                .fg(theme.status_color(issue.status, node.is_blocked))
                .bg(bg),
        ),
        Span::styled(" ", bright),
        Span::styled(issue.title.clone(), bright.add_modifier(Modifier::BOLD)),
    ]));

    // id · status · priority · type · assignee
    let mut meta = vec![
        issue.id.clone(),
        issue.status.as_str().replace('_', " "),
        format!("P{}", issue.priority),
    ];
    if !issue.issue_type.is_empty() {
        meta.push(issue.issue_type.clone());
    }
    if let Some(assignee) = &issue.assignee {
        meta.push(format!("@{assignee}"));
    }
    lines.push(Line::from(Span::styled(
        format!(" {}", meta.join(" \u{00B7} ")),
        dim,
    )));
    if !issue.labels.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(" labels: {}", issue.labels.join(", ")),
            dim,
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(" updated {}", issue.updated_at.format("%Y-%m-%d %H:%M")),
        dim,
    )));
    lines.push(Line::from(""));

    // Relations
    if let Some(parent) = node.parent {
        lines.push(relation_line("parent", graph, &[parent], text, dim));
    }
    let others: Vec<NodeId> = node
        .parents
        .iter()
        .copied()
        .filter(|p| Some(*p) != node.parent)
        .collect();
    if !others.is_empty() {
        lines.push(relation_line("also under", graph, &others, text, dim));
    }
    for blocker in &node.blocked_by {
        let b = graph.node(*blocker);
        let style = if b.status() == Status::Closed {
            dim
        } else {
            Style::default().fg(theme.danger).bg(bg)
        };
        lines.push(Line::from(vec![
            Span::styled(" blocked by ", dim),
            Span::styled(format!("{} ", b.id()), style),
            Span::styled(format!("({}) ", b.status()), dim),
            Span::styled(b.issue.title.clone(), text),
        ]));
    }
    if !node.blocks.is_empty() {
        lines.push(relation_line("blocks", graph, &node.blocks, text, dim));
    }
    if node.has_children() {
        let open = node
            .children
            .iter()
            .filter(|c| graph.node(**c).status() != Status::Closed)
            .count();
        lines.push(Line::from(Span::styled(
            format!(" children: {} ({} not closed)", node.children.len(), open),
            dim,
        )));
    }

    // Description
    if !issue.description.is_empty() {
        lines.push(Line::from(""));
        for line in issue.description.lines() {
            lines.push(Line::from(Span::styled(format!(" {line}"), text)));
        }
    }

    // Comments
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Comments", header)));
    if let Some(err) = &node.comment_error {
        lines.push(Line::from(Span::styled(
            format!(" comments unavailable: {err}"),
            Style::default().fg(theme.danger).bg(bg),
        )));
    } else if !node.comments_loaded {
        lines.push(Line::from(Span::styled(" loading\u{2026}", dim)));
    } else if node.comments.is_empty() {
        lines.push(Line::from(Span::styled(" no comments", dim)));
    } else {
        for comment in &node.comments {
            let author = if comment.author.is_empty() {
                "unknown"
            } else {
                comment.author.as_str()
            };
            lines.push(Line::from(vec![
                Span::styled(format!(" {author}"), bright),
                Span::styled(
                    format!(" \u{00B7} {}", comment.created_at.format("%Y-%m-%d %H:%M")),
                    dim,
                ),
            ]));
            for line in comment.text.lines() {
                lines.push(Line::from(Span::styled(format!("   {line}"), text)));
            }
        }
    }

    lines
}

fn relation_line(
    label: &str,
    graph: &Graph,
    ids: &[NodeId],
    text: Style,
    dim: Style,
) -> Line<'static> {
    let mut spans = vec![Span::styled(format!(" {label} "), dim)];
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(", ", dim));
        }
        let node = graph.node(*id);
        spans.push(Span::styled(node.id().to_string(), text));
        if ids.len() == 1 {
            spans.push(Span::styled(format!(" {}", node.issue.title), dim));
        }
    }
    Line::from(spans)
}
