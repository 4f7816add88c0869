//! Draw/Type capture orchestration.
//!
//! A session owns both authoring surfaces for its whole lifetime. Exactly one is
//! active at a time; switching modes never touches the inactive surface, and a
//! save only ever projects the active one.
//!
//! ```text
//!   ┌──────────┐  set_mode / toggle   ┌──────────┐
//!   │   Draw   ├──────────────────────►   Type   │
//!   │          ◄──────────────────────┤          │
//!   └────┬─────┘                      └────┬─────┘
//!        │ save                            │ save
//!        ▼                                 ▼
//!   drawing payload                   text payload
//! ```
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, ConfigError, SurfaceError};
use crate::input::InputEvent;
use crate::pen::{PenConfiguration, SharedPen};
use crate::raster::{RasterArtifact, RasterPipeline};
use crate::surface::DrawingSurface;
use crate::text::{TextSurface, TextSurfaceOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Draw,
    Type,
}

impl CaptureMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Draw => Self::Type,
            Self::Type => Self::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Draw => "Draw",
            Self::Type => "Type",
        }
    }
}

/// Content produced by a save. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrescriptionPayload {
    Drawing {
        /// `None` when nothing was drawn
        #[serde(rename = "dataURI")]
        data_uri: Option<String>,
    },
    Text {
        html: String,
        plain: String,
    },
}

impl PrescriptionPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Drawing { .. } => "drawing",
            Self::Text { .. } => "text",
        }
    }

    /// Whether there is nothing worth rasterizing
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Drawing { data_uri } => data_uri.is_none(),
            Self::Text { plain, .. } => plain.trim().is_empty(),
        }
    }
}

#[derive(Debug)]
pub struct CaptureSession {
    mode: CaptureMode,
    pen: SharedPen,
    drawing: DrawingSurface,
    text: TextSurface,
}

impl Default for CaptureSession {
    fn default() -> Self {
        let pen = PenConfiguration::default().into_shared();
        Self {
            mode: CaptureMode::Draw,
            drawing: DrawingSurface::new(pen.clone()),
            text: TextSurface::new("", TextSurfaceOptions::default()),
            pen,
        }
    }
}

impl CaptureSession {
    pub fn from_config(config: &CaptureConfig) -> Result<Self, ConfigError> {
        Self::with_initial_html(config, "")
    }

    /// Like [`Self::from_config`], seeding the text surface with `initial_html`
    pub fn with_initial_html(config: &CaptureConfig, initial_html: &str) -> Result<Self, ConfigError> {
        let pen = config.pen()?.into_shared();
        Ok(Self {
            mode: CaptureMode::Draw,
            drawing: DrawingSurface::new(pen.clone())
                .with_device_pixel_ratio(config.device_pixel_ratio),
            text: TextSurface::new(initial_html, config.text_options()),
            pen,
        })
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CaptureMode) {
        if self.mode != mode {
            // A stroke cannot continue on a surface that is no longer shown
            self.drawing.end_stroke();
            info!("Capture mode: {}", mode.label());
            self.mode = mode;
        }
    }

    pub fn toggle_mode(&mut self) -> CaptureMode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    pub fn pen(&self) -> &SharedPen {
        &self.pen
    }

    pub fn drawing(&self) -> &DrawingSurface {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut DrawingSurface {
        &mut self.drawing
    }

    pub fn text(&self) -> &TextSurface {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut TextSurface {
        &mut self.text
    }

    /// Route input to the active surface
    pub fn handle_input(&mut self, event: &InputEvent) {
        match self.mode {
            CaptureMode::Draw => self.drawing.handle_input(event),
            CaptureMode::Type => self.text.handle_input(event),
        }
    }

    /// Project the active surface into a payload
    pub fn save(&self) -> Result<PrescriptionPayload, SurfaceError> {
        let payload = match self.mode {
            CaptureMode::Draw => PrescriptionPayload::Drawing {
                data_uri: if self.drawing.has_ink() {
                    self.drawing.export_data_uri()?
                } else {
                    None
                },
            },
            CaptureMode::Type => {
                let (html, plain) = self.text.projection();
                PrescriptionPayload::Text { html, plain }
            }
        };
        info!("Saved {} payload", payload.kind());
        Ok(payload)
    }

    /// Save, then rasterize through `pipeline`.
    ///
    /// The text surface is read-only while the capture is in flight and gets its
    /// previous state back afterwards, whatever the outcome.
    pub async fn save_and_rasterize(
        &mut self,
        pipeline: &RasterPipeline,
        subject: &str,
    ) -> Result<Option<RasterArtifact>, CaptureError> {
        let payload = self.save()?;

        let was_read_only = self.text.is_read_only();
        if self.mode == CaptureMode::Type {
            self.text.set_read_only(true);
        }
        let result = pipeline.rasterize_or_fallback(&payload, subject).await;
        self.text.set_read_only(was_read_only);

        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;

    #[test]
    fn test_payload_wire_format() {
        let drawing = PrescriptionPayload::Drawing { data_uri: None };
        assert_eq!(
            serde_json::to_string(&drawing).unwrap(),
            r#"{"kind":"drawing","dataURI":null}"#
        );
        let text: PrescriptionPayload =
            serde_json::from_str(r#"{"kind":"text","html":"<p>a</p>","plain":"a"}"#).unwrap();
        assert_eq!(text.kind(), "text");
        assert!(!text.is_empty());
    }

    #[test]
    fn test_switching_modes_keeps_both_surfaces() {
        let mut session = CaptureSession::default();
        session.drawing_mut().resize(20.0, 20.0).unwrap();
        session.handle_input(&InputEvent::pointer_down(2.0, 2.0));
        session.handle_input(&InputEvent::pointer_up(15.0, 15.0));

        session.set_mode(CaptureMode::Type);
        session.handle_input(&InputEvent::Text("Rx".into()));
        assert_eq!(session.text().plain_text(), "Rx");

        assert_eq!(session.toggle_mode(), CaptureMode::Draw);
        assert!(session.drawing().has_ink());
        assert!(matches!(
            session.save().unwrap(),
            PrescriptionPayload::Drawing { data_uri: Some(_) }
        ));
    }

    #[test]
    fn test_input_only_reaches_active_surface() {
        let mut session = CaptureSession::default();
        session.handle_input(&InputEvent::Text("ignored".into()));
        assert_eq!(session.text().plain_text(), "");
    }
}
