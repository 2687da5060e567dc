use std::collections::BTreeMap;

use ratatui::style::{Color, Modifier, Style};

use crate::graph::NodeFlags;

/// Parsed color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub highlight: Color,
    pub dim: Color,
    pub critical: Color,
    pub edge: Color,
    pub link: Color,
    pub error: Color,
    pub ok: Color,
    pub selection_bg: Color,
    pub search_match_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x0C, 0x00, 0x1B),
            text: Color::Rgb(0xB0, 0xAA, 0xFF),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            highlight: Color::Rgb(0xFB, 0x41, 0x96),
            dim: Color::Rgb(0x4A, 0x46, 0x70),
            critical: Color::Rgb(0xFF, 0x44, 0x44),
            edge: Color::Rgb(0x7D, 0x78, 0xBF),
            link: Color::Rgb(0x44, 0xDD, 0xFF),
            error: Color::Rgb(0xFF, 0x44, 0x44),
            ok: Color::Rgb(0x44, 0xFF, 0x88),
            selection_bg: Color::Rgb(0x3D, 0x14, 0x38),
            search_match_fg: Color::Rgb(0x40, 0xE0, 0xD0),
        }
    }
}

/// Parse a hex color string like "#FF4444" into an RGB Color
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

impl Theme {
    /// Defaults with `[view.colors]` overrides applied
    pub fn from_colors(colors: &BTreeMap<String, String>) -> Self {
        let mut theme = Theme::default();
        for (key, value) in colors {
            let Some(color) = parse_hex_color(value) else {
                tracing::warn!(%key, %value, "ignoring invalid theme color");
                continue;
            };
            match key.as_str() {
                "background" => theme.background = color,
                "text" => theme.text = color,
                "text_bright" => theme.text_bright = color,
                "highlight" => theme.highlight = color,
                "dim" => theme.dim = color,
                "critical" => theme.critical = color,
                "edge" => theme.edge = color,
                "link" => theme.link = color,
                "error" => theme.error = color,
                "ok" => theme.ok = color,
                "selection_bg" => theme.selection_bg = color,
                "search_match_fg" => theme.search_match_fg = color,
                _ => {}
            }
        }
        theme
    }

    /// Style for a node label. Dimming wins over everything but selection.
    /// Matches are only marked while a search term is active, since an empty
    /// term matches every node.
    pub fn node_style(&self, flags: &NodeFlags, searching: bool) -> Style {
        let mut style = Style::default().fg(self.text).bg(self.background);
        if flags.is_critical {
            style = style.fg(self.critical);
        }
        if flags.is_link_target {
            style = style.fg(self.link);
        }
        if flags.is_link_source {
            style = style.fg(self.link).add_modifier(Modifier::BOLD);
        }
        if searching && flags.is_search_match {
            style = style.add_modifier(Modifier::UNDERLINED);
            if !flags.is_critical {
                style = style.fg(self.search_match_fg);
            }
        }
        if flags.is_dimmed {
            style = style.fg(self.dim);
        }
        if flags.is_selected {
            style = style
                .bg(self.selection_bg)
                .fg(self.text_bright)
                .add_modifier(Modifier::BOLD);
        }
        style
    }

    pub fn edge_color(&self, is_critical: bool) -> Color {
        if is_critical { self.critical } else { self.edge }
    }
}
