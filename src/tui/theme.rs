use ratatui::style::Color;

use crate::model::{Status, UiConfig};

/// Colors used by the renderers. Every slot can be overridden from
/// `[ui.colors]` by its field name.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    /// In-progress work, headers, the focused pane
    pub accent: Color,
    pub muted: Color,
    pub danger: Color,
    pub warn: Color,
    pub ok: Color,
    pub info: Color,
    pub selection_bg: Color,
    pub selection_bar: Color,
    pub match_bg: Color,
    pub match_fg: Color,
    pub alert_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x10, 0x14, 0x1C),
            text: Color::Rgb(0xC3, 0xCB, 0xD9),
            text_bright: Color::Rgb(0xF2, 0xF4, 0xF8),
            accent: Color::Rgb(0xE8, 0xA2, 0x3B),
            muted: Color::Rgb(0x6B, 0x75, 0x88),
            danger: Color::Rgb(0xE0, 0x5A, 0x5A),
            warn: Color::Rgb(0xE6, 0xC3, 0x4F),
            ok: Color::Rgb(0x7F, 0xC9, 0x7A),
            info: Color::Rgb(0x5C, 0xB8, 0xD6),
            selection_bg: Color::Rgb(0x23, 0x2B, 0x3A),
            selection_bar: Color::Rgb(0xE8, 0xA2, 0x3B),
            match_bg: Color::Rgb(0x5C, 0xB8, 0xD6),
            match_fg: Color::Rgb(0x10, 0x14, 0x1C),
            alert_bg: Color::Rgb(0x7A, 0x1F, 0x24),
        }
    }
}

/// `#RRGGBB` or `#RGB`
fn parse_hex_color(value: &str) -> Option<Color> {
    let digits = value.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some(Color::Rgb(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let mut rgb = digits.chars().map(|c| channel(&c.to_string()).map(|v| v * 17));
            Some(Color::Rgb(rgb.next()??, rgb.next()??, rgb.next()??))
        }
        _ => None,
    }
}

impl Theme {
    fn slot_mut(&mut self, name: &str) -> Option<&mut Color> {
        Some(match name {
            "background" => &mut self.background,
            "text" => &mut self.text,
            "text_bright" => &mut self.text_bright,
            "accent" => &mut self.accent,
            "muted" => &mut self.muted,
            "danger" => &mut self.danger,
            "warn" => &mut self.warn,
            "ok" => &mut self.ok,
            "info" => &mut self.info,
            "selection_bg" => &mut self.selection_bg,
            "selection_bar" => &mut self.selection_bar,
            "match_bg" => &mut self.match_bg,
            "match_fg" => &mut self.match_fg,
            "alert_bg" => &mut self.alert_bg,
            _ => return None,
        })
    }

    /// Defaults with the `[ui.colors]` overrides applied. Unknown names and
    /// unparseable values are logged and skipped.
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();
        for (name, value) in &ui.colors {
            match (parse_hex_color(value), theme.slot_mut(name)) {
                (Some(color), Some(slot)) => *slot = color,
                (None, _) => tracing::warn!(%name, %value, "ignoring invalid color"),
                (_, None) => tracing::warn!(%name, "ignoring unknown color name"),
            }
        }
        theme
    }

    /// Color of the status glyph for an issue
    pub fn status_color(&self, status: Status, blocked: bool) -> Color {
        match status {
            Status::Closed => self.muted,
            Status::InProgress => self.accent,
            Status::Open if blocked => self.danger,
            Status::Open => self.text,
        }
    }

    /// Color of the `P0`..`P4` badge
    pub fn priority_color(&self, priority: u8) -> Color {
        match priority {
            0 => self.danger,
            1 => self.warn,
            2 => self.text,
            _ => self.muted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(parse_hex_color("#e05a5a"), Some(Color::Rgb(0xE0, 0x5A, 0x5A)));
        assert_eq!(parse_hex_color("#f80"), Some(Color::Rgb(0xFF, 0x88, 0x00)));
        assert_eq!(parse_hex_color("e05a5a"), None);
        assert_eq!(parse_hex_color("#e05a"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn config_overrides_known_slots_only() {
        let mut ui = UiConfig::default();
        ui.colors.insert("accent".into(), "#ff8800".into());
        ui.colors.insert("ok".into(), "green-ish".into());
        ui.colors.insert("sparkle".into(), "#112233".into());

        let theme = Theme::from_config(&ui);
        let defaults = Theme::default();
        assert_eq!(theme.accent, Color::Rgb(0xFF, 0x88, 0x00));
        assert_eq!(theme.ok, defaults.ok);
        assert_eq!(theme.background, defaults.background);
    }

    #[test]
    fn blocked_open_work_is_flagged() {
        let theme = Theme::default();
        assert_eq!(theme.status_color(Status::InProgress, false), theme.accent);
        assert_eq!(theme.status_color(Status::Open, true), theme.danger);
        assert_eq!(theme.status_color(Status::Open, false), theme.text);
        assert_eq!(theme.status_color(Status::Closed, true), theme.muted);
        assert_eq!(theme.priority_color(0), theme.danger);
    }
}
