use std::time::Duration;
use thiserror::Error;

/// Errors raised by the drawing surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Requested backing buffer has no area or is too large to allocate
    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// The pixel buffer could not be serialized
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Errors raised while turning a payload into a raster artifact
#[derive(Error, Debug, Clone)]
pub enum RasterError {
    /// Data URI was malformed or did not hold a decodable image
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),
    /// Off-document layout or bitmap capture failed
    #[error("Capture failed: {0}")]
    Capture(String),
    /// Layout and font readiness did not settle in time
    #[error("Layout did not settle within {0:?}")]
    SettleTimeout(Duration),
    /// Font database could not be prepared
    #[error("Font loading failed: {0}")]
    Fonts(String),
    /// The captured bitmap could not be serialized
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
    /// A strategy was handed a payload kind it does not handle
    #[error("Strategy {strategy} cannot rasterize a {kind} payload")]
    UnsupportedPayload {
        strategy: &'static str,
        kind: &'static str,
    },
}

impl RasterError {
    /// True for failures of the styled capture path that the manual layout can recover from
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(
            self,
            Self::Capture(_) | Self::SettleTimeout(_) | Self::Fonts(_)
        )
    }
}

/// Errors raised by the submission adapter
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Artifact is empty")]
    EmptyArtifact,
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid pen color: {0}")]
    InvalidColor(String),
}

/// Errors raised while saving and rasterizing a prescription
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Raster(#[from] RasterError),
}
