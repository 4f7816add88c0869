#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod capture;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod event;
pub mod input;
pub mod panels;
pub mod pen;
pub mod raster;
pub mod submission;
pub mod surface;
pub mod text;
pub mod util;

pub use app::PrescriptionApp;
pub use capture::{CaptureMode, CaptureSession, PrescriptionPayload};
pub use config::CaptureConfig;
pub use error::{CaptureError, ConfigError, RasterError, SubmissionError, SurfaceError};
pub use input::{InputEvent, InputLocation};
pub use pen::{PenConfiguration, PenMode, SharedPen};
pub use raster::{RasterArtifact, RasterOptions, RasterPipeline, RasterStrategy};
pub use submission::{Submission, export_to_dir};
pub use surface::DrawingSurface;
pub use text::TextSurface;
