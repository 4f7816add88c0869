use egui::Color32;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ConfigError;

pub const MIN_PEN_WIDTH: u8 = 1;
pub const MAX_PEN_WIDTH: u8 = 20;

/// Whether strokes paint ink or clear pixels to transparent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenMode {
    #[default]
    Draw,
    Erase,
}

/// Color, width and mode applied to the next stroke
#[derive(Debug, Clone, PartialEq)]
pub struct PenConfiguration {
    color: Color32,
    width: u8,
    mode: PenMode,
}

/// Pen handle shared between the host UI and the drawing surface
pub type SharedPen = Arc<RwLock<PenConfiguration>>;

impl Default for PenConfiguration {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            width: 2,
            mode: PenMode::Draw,
        }
    }
}

impl PenConfiguration {
    pub fn new(color: Color32, width: u8, mode: PenMode) -> Self {
        Self {
            color,
            width: width.clamp(MIN_PEN_WIDTH, MAX_PEN_WIDTH),
            mode,
        }
    }

    pub fn into_shared(self) -> SharedPen {
        Arc::new(RwLock::new(self))
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn set_color(&mut self, color: Color32) {
        self.color = color;
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    /// Out-of-range widths are clamped to 1..=20
    pub fn set_width(&mut self, width: u8) {
        self.width = width.clamp(MIN_PEN_WIDTH, MAX_PEN_WIDTH);
    }

    pub fn mode(&self) -> PenMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PenMode) {
        self.mode = mode;
    }

    /// Color in `#rrggbb` form
    pub fn to_css(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.color.r(),
            self.color.g(),
            self.color.b()
        )
    }

    /// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)`
    pub fn parse_color(input: &str) -> Result<Color32, ConfigError> {
        let s = input.trim();
        let invalid = || ConfigError::InvalidColor(input.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());
            return match hex.len() {
                3 => {
                    let (r, g, b) = (&hex[0..1], &hex[1..2], &hex[2..3]);
                    Ok(Color32::from_rgb(
                        channel(r)? * 17,
                        channel(g)? * 17,
                        channel(b)? * 17,
                    ))
                }
                6 => Ok(Color32::from_rgb(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                )),
                _ => Err(invalid()),
            };
        }

        let inner = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let parts = inner
            .split(',')
            .map(|p| p.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [r, g, b] => Ok(Color32::from_rgb(*r, *g, *b)),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_is_clamped() {
        let mut pen = PenConfiguration::new(Color32::BLACK, 0, PenMode::Draw);
        assert_eq!(pen.width(), 1);
        pen.set_width(55);
        assert_eq!(pen.width(), 20);
        pen.set_width(7);
        assert_eq!(pen.width(), 7);
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(
            PenConfiguration::parse_color("#ff0000").unwrap(),
            Color32::from_rgb(255, 0, 0)
        );
        assert_eq!(
            PenConfiguration::parse_color("#0f0").unwrap(),
            Color32::from_rgb(0, 255, 0)
        );
        assert_eq!(
            PenConfiguration::parse_color("rgb(1, 2, 3)").unwrap(),
            Color32::from_rgb(1, 2, 3)
        );
        assert!(PenConfiguration::parse_color("blue").is_err());
        assert!(PenConfiguration::parse_color("rgb(1,2)").is_err());
    }

    #[test]
    fn test_css_round_trip() {
        let pen = PenConfiguration::new(Color32::from_rgb(18, 52, 86), 3, PenMode::Draw);
        assert_eq!(pen.to_css(), "#123456");
    }
}
