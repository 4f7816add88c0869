use log::{error, warn};

use crate::capture::CaptureSession;
use crate::config::CaptureConfig;
use crate::panels::{central_panel, controls_panel};
use crate::raster::{RasterArtifact, RasterPipeline, system_fonts};
use crate::submission::export_to_dir;

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct PrescriptionApp {
    pub(crate) config: CaptureConfig,
    pub(crate) subject: String,
    #[serde(skip)]
    pub(crate) session: CaptureSession,
    #[serde(skip)]
    pub(crate) pipeline: RasterPipeline,
    // GPU copy of the drawing buffer
    #[serde(skip)]
    pub(crate) canvas_texture: Option<egui::TextureHandle>,
    #[serde(skip)]
    pub(crate) canvas_dirty: bool,
    // Primary button went down on the canvas and has not been released yet
    #[serde(skip)]
    pub(crate) pointer_held: bool,
    #[serde(skip)]
    pub(crate) last_artifact: Option<RasterArtifact>,
    #[serde(skip)]
    pub(crate) status: String,
}

impl Default for PrescriptionApp {
    fn default() -> Self {
        Self {
            config: CaptureConfig::default(),
            subject: String::new(),
            session: CaptureSession::default(),
            pipeline: RasterPipeline::default(),
            canvas_texture: None,
            canvas_dirty: true,
            pointer_held: false,
            last_artifact: None,
            status: String::new(),
        }
    }
}

impl PrescriptionApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let restored: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_config(restored.config, restored.subject)
    }

    pub fn with_config(config: CaptureConfig, subject: String) -> Self {
        let session = CaptureSession::from_config(&config).unwrap_or_else(|e| {
            warn!("Ignoring stored configuration: {}", e);
            CaptureSession::default()
        });
        // Start the installed-font scan now so the first text save does not wait on it
        let _ = system_fonts();
        Self {
            pipeline: RasterPipeline::new(config.raster.clone()),
            config,
            subject,
            session,
            ..Self::default()
        }
    }

    /// Save the active surface, rasterize it and write the image to the working directory
    pub(crate) fn save_prescription(&mut self) {
        let result = futures::executor::block_on(
            self.session.save_and_rasterize(&self.pipeline, &self.subject),
        );
        match result {
            Ok(None) => self.status = "Nothing to save yet".to_string(),
            Ok(Some(artifact)) => {
                self.status = match export_to_dir(&artifact, ".") {
                    Ok(path) if artifact.truncated_lines() > 0 => format!(
                        "Saved {} ({} lines did not fit)",
                        path.display(),
                        artifact.truncated_lines()
                    ),
                    Ok(path) => format!("Saved {}", path.display()),
                    Err(e) => format!("Export failed: {}", e),
                };
                self.dismiss_artifact();
                self.last_artifact = Some(artifact);
            }
            Err(e) => {
                error!("Save failed: {}", e);
                self.status = format!("Save failed: {}", e);
            }
        }
    }

    /// Release the object URL of the last saved artifact
    pub(crate) fn dismiss_artifact(&mut self) {
        if let Some(artifact) = self.last_artifact.take() {
            self.pipeline.object_urls().revoke(artifact.object_url());
        }
    }
}

impl eframe::App for PrescriptionApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        controls_panel(self, ctx);
        central_panel(self, ctx);
    }
}
