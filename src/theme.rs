//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tile and UI colours, One Dark by default.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Resting tile background.
    pub tile: Color,
    /// Tile being dragged (and the floating copy under the pointer).
    pub dragging: Color,
    /// Legal drop target (easy mode only).
    pub valid_target: Color,
    /// Tile that just received a merge.
    pub merged: Color,
    /// Keyboard cursor outline.
    pub cursor: Color,
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, values).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Modes that can't be selected right now.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults (values from onedark.theme).
    pub fn onedark_default() -> Self {
        Self {
            tile: Color::Rgb(0x3F, 0x44, 0x4F),       // div_line
            dragging: Color::Rgb(0x61, 0xAF, 0xEF),   // cpu_box / blue
            valid_target: Color::Rgb(0x98, 0xC3, 0x79), // mem_box / green
            merged: Color::Rgb(0xE5, 0xC0, 0x7B),     // title / yellow
            cursor: Color::Rgb(0xC6, 0x78, 0xDD),     // net_box / magenta
            bg: Color::Rgb(0x31, 0x35, 0x3F),         // meter_bg
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),   // div_line
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),    // main_fg
            title: Color::Rgb(0xE5, 0xC0, 0x7B),      // title
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70), // inactive_fg
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override tile state colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tile = Color::Rgb(0x30, 0x30, 0x30);
                self.dragging = Color::Rgb(0x00, 0x88, 0xFF);
                self.valid_target = Color::Rgb(0x00, 0xFF, 0x00);
                self.merged = Color::Rgb(0xFF, 0xFF, 0x00);
                self.cursor = Color::Rgb(0xFF, 0x00, 0xFF);
                self.main_fg = Color::Rgb(0xFF, 0xFF, 0xFF);
            }
            crate::Palette::Colorblind => {
                // Blue/orange/teal; never red against green.
                self.dragging = Color::Rgb(0x00, 0x77, 0xBB);
                self.valid_target = Color::Rgb(0x00, 0x99, 0x88);
                self.merged = Color::Rgb(0xEE, 0x77, 0x33);
                self.cursor = Color::Rgb(0xEE, 0x33, 0x77);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let d = Self::onedark_default();
        // Keys match onedark.theme.
        Self {
            tile: get("div_line").unwrap_or(d.tile),
            dragging: get("cpu_box").unwrap_or(d.dragging),
            valid_target: get("mem_box")
                .or_else(|| get("cpu_start"))
                .unwrap_or(d.valid_target),
            merged: get("title").or_else(|| get("cpu_mid")).unwrap_or(d.merged),
            cursor: get("net_box").unwrap_or(d.cursor),
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return Err(ThemeError::InvalidHex(s.to_string()));
    }
    let channel = |part: &str| {
        u8::from_str_radix(part, 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GGHHII"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_from_map_overrides_and_falls_back() {
        let map = parse_theme_file(
            "# comment\ntheme[mem_box]='#00FF00'\ntheme[title]=\"#123\"\ngarbage line\n",
        );
        let t = Theme::from_map(&map);
        assert_eq!(t.valid_target, Color::Rgb(0, 255, 0));
        assert_eq!(t.title, Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(t.bg, Theme::onedark_default().bg);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let t = Theme::load(
            Some(Path::new("/nonexistent/fiboflow.theme")),
            crate::Palette::Normal,
        )
        .unwrap();
        assert_eq!(t.merged, Theme::onedark_default().merged);
    }
}
