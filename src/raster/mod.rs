//! Turns a [`PrescriptionPayload`] into one canonical PNG artifact.
//!
//! Each payload kind is handled by a [`RasterStrategy`]: drawings are decoded
//! directly, text goes through the styled [`FidelityCapture`] and can fall back
//! to the plain [`ManualLayout`].

mod bitmap;
mod canvas;
mod fallback;
mod fidelity;
mod fonts;
mod object_url;

pub use bitmap::BitmapDecode;
pub use fallback::ManualLayout;
pub use fidelity::FidelityCapture;
pub use fonts::{bundled_fonts, system_fonts};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};

use futures::future::BoxFuture;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::PrescriptionPayload;
use crate::data_uri::{self, PNG_CONTENT_TYPE};
use crate::error::RasterError;
use crate::util::time;

/// What the manual layout does with text that does not fit the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the fixed page height and drop the lines that do not fit
    Truncate,
    /// Grow the page until every line fits
    #[default]
    Extend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RasterOptions {
    /// Scale factor of the styled capture
    pub supersample: f32,
    pub settle_timeout_ms: u64,
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub fallback_margin: u32,
    pub fallback_font_size: f32,
    pub fallback_line_height: f32,
    pub overflow: OverflowPolicy,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            settle_timeout_ms: 5000,
            fallback_width: 800,
            fallback_height: 1000,
            fallback_margin: 40,
            fallback_font_size: 16.0,
            fallback_line_height: 24.0,
            overflow: OverflowPolicy::Extend,
        }
    }
}

impl RasterOptions {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// Everything a strategy needs besides the payload
pub struct RasterContext<'a> {
    /// Patient name, used in the fallback header and the filename
    pub subject: &'a str,
    pub options: &'a RasterOptions,
    pub object_urls: &'a ObjectUrlRegistry,
}

/// Canonical raster output shared by every strategy.
///
/// `object_url` stays registered until the caller revokes it.
#[derive(Debug, Clone)]
pub struct RasterArtifact {
    bytes: Arc<[u8]>,
    data_uri: String,
    object_url: ObjectUrl,
    width: u32,
    height: u32,
    suggested_filename: String,
    content_type: String,
    truncated_lines: usize,
}

impl RasterArtifact {
    /// Wrap encoded PNG bytes and register their object URL
    pub fn from_png(png: Vec<u8>, width: u32, height: u32, ctx: &RasterContext<'_>) -> Self {
        let data_uri = data_uri::encode_png(&png);
        let bytes: Arc<[u8]> = Arc::from(png);
        let object_url = ctx.object_urls.create(Arc::clone(&bytes), PNG_CONTENT_TYPE);
        Self {
            bytes,
            data_uri,
            object_url,
            width,
            height,
            suggested_filename: suggested_filename(ctx.subject, &time::now()),
            content_type: PNG_CONTENT_TYPE.to_string(),
            truncated_lines: 0,
        }
    }

    pub(crate) fn with_truncated_lines(mut self, truncated_lines: usize) -> Self {
        self.truncated_lines = truncated_lines;
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn object_url(&self) -> &ObjectUrl {
        &self.object_url
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn suggested_filename(&self) -> &str {
        &self.suggested_filename
    }

    /// Lines the manual layout dropped because they did not fit
    pub fn truncated_lines(&self) -> usize {
        self.truncated_lines
    }
}

/// `prescription-<subject>-<timestamp>.png`
pub fn suggested_filename(subject: &str, at: &chrono::DateTime<chrono::Local>) -> String {
    format!(
        "prescription-{}-{}.png",
        slug(subject),
        time::filename_timestamp(at)
    )
}

fn slug(subject: &str) -> String {
    let mut out = String::new();
    for c in subject.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "patient".to_string()
    } else {
        trimmed.to_string()
    }
}

/// One way of turning a payload into an artifact
pub trait RasterStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn rasterize<'a>(
        &'a self,
        payload: &'a PrescriptionPayload,
        ctx: &'a RasterContext<'a>,
    ) -> BoxFuture<'a, Result<RasterArtifact, RasterError>>;
}

/// Dispatches payloads to strategies by kind
pub struct RasterPipeline {
    options: RasterOptions,
    object_urls: Arc<ObjectUrlRegistry>,
    drawing: Box<dyn RasterStrategy>,
    text: Box<dyn RasterStrategy>,
    fallback: Box<dyn RasterStrategy>,
}

impl std::fmt::Debug for RasterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterPipeline")
            .field("options", &self.options)
            .field("drawing", &self.drawing.name())
            .field("text", &self.text.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl Default for RasterPipeline {
    fn default() -> Self {
        Self::new(RasterOptions::default())
    }
}

impl RasterPipeline {
    pub fn new(options: RasterOptions) -> Self {
        Self {
            options,
            object_urls: Arc::new(ObjectUrlRegistry::new()),
            drawing: Box::new(BitmapDecode),
            text: Box::new(FidelityCapture),
            fallback: Box::new(ManualLayout),
        }
    }

    pub fn with_text_strategy(mut self, strategy: Box<dyn RasterStrategy>) -> Self {
        self.text = strategy;
        self
    }

    pub fn with_fallback_strategy(mut self, strategy: Box<dyn RasterStrategy>) -> Self {
        self.fallback = strategy;
        self
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    pub fn object_urls(&self) -> &Arc<ObjectUrlRegistry> {
        &self.object_urls
    }

    /// Rasterize with the primary strategy for the payload kind.
    /// A drawing payload without an image yields `None`.
    pub async fn rasterize(
        &self,
        payload: &PrescriptionPayload,
        subject: &str,
    ) -> Result<Option<RasterArtifact>, RasterError> {
        let strategy = match payload {
            PrescriptionPayload::Drawing { data_uri: None } => return Ok(None),
            PrescriptionPayload::Drawing { .. } => &self.drawing,
            PrescriptionPayload::Text { .. } => &self.text,
        };
        self.run(strategy.as_ref(), payload, subject).await.map(Some)
    }

    /// Rasterize text with the manual layout, skipping the styled capture
    pub async fn rasterize_fallback(
        &self,
        payload: &PrescriptionPayload,
        subject: &str,
    ) -> Result<RasterArtifact, RasterError> {
        self.run(self.fallback.as_ref(), payload, subject).await
    }

    /// Like [`Self::rasterize`], retrying text with the manual layout when the styled capture fails
    pub async fn rasterize_or_fallback(
        &self,
        payload: &PrescriptionPayload,
        subject: &str,
    ) -> Result<Option<RasterArtifact>, RasterError> {
        match self.rasterize(payload, subject).await {
            Err(err)
                if err.is_recoverable_by_fallback()
                    && matches!(payload, PrescriptionPayload::Text { .. }) =>
            {
                warn!("{} failed ({}), using {}", self.text.name(), err, self.fallback.name());
                self.rasterize_fallback(payload, subject).await.map(Some)
            }
            other => other,
        }
    }

    async fn run(
        &self,
        strategy: &dyn RasterStrategy,
        payload: &PrescriptionPayload,
        subject: &str,
    ) -> Result<RasterArtifact, RasterError> {
        let ctx = RasterContext {
            subject,
            options: &self.options,
            object_urls: &self.object_urls,
        };
        let artifact = strategy.rasterize(payload, &ctx).await?;
        info!(
            "📄 {} produced {} ({}x{}, {} bytes)",
            strategy.name(),
            artifact.suggested_filename(),
            artifact.width(),
            artifact.height(),
            artifact.size()
        );
        Ok(artifact)
    }
}
