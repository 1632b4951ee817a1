use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::dashboard::NoticeKind;
use crate::tui::app::{App, Mode};
use crate::util::unicode::{display_width, truncate_to_width};

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let dim = Style::default().fg(app.theme.muted).bg(bg);

    let (mut spans, hint) = match app.mode {
        Mode::Navigate => (navigate_spans(app), right_summary(app)),
        Mode::Filter => (
            prompt_spans(app, "/".to_string()),
            "Enter keep  Esc cancel".to_string(),
        ),
        Mode::Create => {
            let label = match &app.create_parent {
                Some(parent) => format!("new under {parent}: "),
                None => "new: ".to_string(),
            };
            (prompt_spans(app, label), "Enter create  Esc cancel".to_string())
        }
    };

    let content_width: usize = spans.iter().map(|s| display_width(&s.content)).sum();
    let hint_width = display_width(&hint);
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(hint, dim));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// Most recent notice, above the status row
pub fn render_notice_row(frame: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = app.dashboard.notices().latest() else {
        return;
    };
    let theme = &app.theme;
    let style = match notice.kind {
        NoticeKind::Refresh | NoticeKind::Operation => Style::default()
            .fg(theme.text_bright)
            .bg(theme.alert_bg)
            .add_modifier(Modifier::BOLD),
        NoticeKind::Warning => Style::default().fg(theme.warn).bg(theme.background),
    };
    let prefix = match notice.kind {
        NoticeKind::Refresh => "refresh failed: ",
        NoticeKind::Operation => "",
        NoticeKind::Warning => "warning: ",
    };
    let suffix = "  Esc dismiss";
    let room = (area.width as usize).saturating_sub(display_width(suffix) + 2);
    let message = truncate_to_width(&format!("{prefix}{}", notice.message), room);
    let line = Line::from(vec![
        Span::styled(format!(" {message} "), style),
        Span::styled(suffix, Style::default().fg(theme.muted).bg(theme.background)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.background)),
        area,
    );
}

fn navigate_spans(app: &App) -> Vec<Span<'static>> {
    let theme = &app.theme;
    let bg = theme.background;
    let filter = app.dashboard.filter();
    let mut spans = vec![Span::styled(
        format!(" [{}]", filter.mode.label()),
        Style::default().fg(theme.accent).bg(bg),
    )];
    if !filter.text.trim().is_empty() {
        spans.push(Span::styled(
            format!(" /{}", filter.text),
            Style::default().fg(theme.text_bright).bg(bg),
        ));
    }
    if app.dashboard.refresh_in_flight() {
        spans.push(Span::styled(
            " \u{27F3}", // ⟳
            Style::default().fg(theme.info).bg(bg),
        ));
    }
    spans
}

fn prompt_spans(app: &App, label: String) -> Vec<Span<'static>> {
    let bg = app.theme.background;
    vec![
        Span::styled(label, Style::default().fg(app.theme.muted).bg(bg)),
        Span::styled(
            app.prompt.clone(),
            Style::default().fg(app.theme.text_bright).bg(bg),
        ),
        Span::styled("\u{258C}", Style::default().fg(app.theme.accent).bg(bg)), // ▌ cursor
    ]
}

/// Stats over the visible rows plus the last refresh digest
fn right_summary(app: &App) -> String {
    let stats = app.dashboard.stats();
    let mut parts = vec![format!(
        "{} open \u{00B7} {} active \u{00B7} {} ready \u{00B7} {} blocked \u{00B7} {} closed",
        stats.open, stats.in_progress, stats.ready, stats.blocked, stats.closed
    )];
    if let Some(record) = app.dashboard.last_refresh() {
        let local = record.at.with_timezone(&chrono::Local);
        let digest = if record.digest.is_empty() {
            "no changes".to_string()
        } else {
            record.digest.summary()
        };
        parts.push(format!("{} @ {}", digest, local.format("%H:%M:%S")));
    }
    format!("{} ", parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, Status};
    use crate::tui::render::test_helpers::{TERM_W, app_with, render_to_string};
    use crate::view::ViewMode;

    fn issues() -> Vec<Issue> {
        vec![
            Issue::new("bd-1", "Parser"),
            Issue::new("bd-2", "Lexer").with_status(Status::InProgress),
            Issue::new("bd-3", "Docs").with_status(Status::Closed),
        ]
    }

    #[test]
    fn navigate_shows_mode_filter_and_stats() {
        let mut app = app_with(issues());
        app.dashboard.set_view_mode(ViewMode::Active);
        app.dashboard.set_filter_text("er");
        let output = render_to_string(TERM_W, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert!(output.starts_with(" [active] /er"), "{output}");
        assert!(output.ends_with("1 open \u{00B7} 1 active \u{00B7} 1 ready \u{00B7} 0 blocked \u{00B7} 0 closed"));
    }

    #[test]
    fn prompts_show_their_label() {
        let mut app = app_with(issues());
        app.mode = Mode::Create;
        app.create_parent = Some("bd-1".into());
        app.prompt = "Write docs".into();
        let output = render_to_string(TERM_W, 1, |frame, area| {
            render_status_row(frame, &app, area);
        });
        assert!(output.starts_with("new under bd-1: Write docs\u{258C}"));
        assert!(output.ends_with("Enter create  Esc cancel"));
    }

    #[test]
    fn notice_row_shows_the_latest_notice() {
        let mut app = app_with(issues());
        app.dashboard
            .notify(NoticeKind::Operation, "create failed: bd exited 1");
        let output = render_to_string(TERM_W, 1, |frame, area| {
            render_notice_row(frame, &app, area);
        });
        assert_eq!(output, " create failed: bd exited 1   Esc dismiss");
    }
}
