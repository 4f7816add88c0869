use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pen::{PenConfiguration, PenMode};
use crate::raster::RasterOptions;
use crate::text::{DEFAULT_PLACEHOLDER, TextSurfaceOptions};

/// Settings a capture session is created from.
///
/// Missing fields take their defaults, so configs written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub initial_pen_size: u8,
    /// CSS color, `#rgb`, `#rrggbb` or `rgb(r, g, b)`
    pub initial_pen_color: String,
    pub placeholder: String,
    pub read_only: bool,
    pub device_pixel_ratio: f32,
    pub raster: RasterOptions,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            initial_pen_size: 2,
            initial_pen_color: "#000000".to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            read_only: false,
            device_pixel_ratio: 1.0,
            raster: RasterOptions::default(),
        }
    }
}

impl CaptureConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.pen()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pen the session starts with. The width is clamped to the supported range.
    pub fn pen(&self) -> Result<PenConfiguration, ConfigError> {
        let color = PenConfiguration::parse_color(&self.initial_pen_color)?;
        Ok(PenConfiguration::new(color, self.initial_pen_size, PenMode::Draw))
    }

    pub fn text_options(&self) -> TextSurfaceOptions {
        TextSurfaceOptions {
            placeholder: self.placeholder.clone(),
            read_only: self.read_only,
        }
    }
}
