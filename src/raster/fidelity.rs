//! Styled capture of rich text.
//!
//! The HTML is laid out off-document as SVG text, one `<text>` per wrapped
//! line with a `<tspan>` per styled piece. Capture waits for fonts to settle,
//! measures the natural content box and renders it supersampled.

use futures::future::{BoxFuture, FutureExt};
use log::debug;

use super::canvas::{SvgCanvas, content_extent, escape_xml, render_png};
use super::fonts::{SANS_FAMILY, settled_system_fonts};
use super::{RasterArtifact, RasterContext, RasterStrategy};
use crate::capture::PrescriptionPayload;
use crate::error::RasterError;
use crate::text::{BlockKind, RunStyle, StructuredTextDocument};

const PADDING: f32 = 24.0;
const MAX_LINE_WIDTH: f32 = 720.0;
const BODY_SIZE: f32 = 16.0;
const LINE_HEIGHT: f32 = 1.4;
const LIST_INDENT: f32 = 24.0;
const REGULAR_ADVANCE_EM: f32 = 0.58;
const BOLD_ADVANCE_EM: f32 = 0.62;

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 28.0,
        2 => 22.0,
        _ => 18.0,
    }
}

fn estimate_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { BOLD_ADVANCE_EM } else { REGULAR_ADVANCE_EM };
    text.chars().count() as f32 * size * em
}

#[derive(Debug, Clone, PartialEq)]
struct Piece {
    text: String,
    style: RunStyle,
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    x: f32,
    baseline: f32,
    size: f32,
    width: f32,
    pieces: Vec<Piece>,
}

impl Line {
    fn new(x: f32, size: f32) -> Self {
        Self {
            x,
            baseline: 0.0,
            size,
            width: 0.0,
            pieces: Vec::new(),
        }
    }

    fn push(&mut self, text: &str, style: RunStyle) {
        self.width += estimate_width(text, self.size, style.bold);
        match self.pieces.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.pieces.push(Piece {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn trim_end(&mut self) {
        if let Some(last) = self.pieces.last_mut() {
            let trimmed = last.text.trim_end().len();
            let removed = &last.text[trimmed..];
            self.width -= estimate_width(removed, self.size, last.style.bold);
            last.text.truncate(trimmed);
        }
        self.pieces.retain(|p| !p.text.is_empty());
    }

    fn is_blank(&self) -> bool {
        self.pieces.iter().all(|p| p.text.trim().is_empty())
    }

    fn to_svg(&self) -> String {
        let mut out = format!(
            "<text x=\"{}\" y=\"{}\" font-family=\"{}, sans-serif\" font-size=\"{}\" xml:space=\"preserve\">",
            self.x, self.baseline, SANS_FAMILY, self.size
        );
        for piece in &self.pieces {
            out.push_str("<tspan");
            if piece.style.bold {
                out.push_str(" font-weight=\"bold\"");
            }
            if piece.style.italic {
                out.push_str(" font-style=\"italic\"");
            }
            if piece.style.underline {
                out.push_str(" text-decoration=\"underline\"");
            }
            let [r, g, b, _] = piece.style.color.unwrap_or(egui::Color32::BLACK).to_array();
            out.push_str(&format!(" fill=\"#{:02x}{:02x}{:02x}\">", r, g, b));
            out.push_str(&escape_xml(&piece.text));
            out.push_str("</tspan>");
        }
        out.push_str("</text>");
        out
    }
}

/// Wrapped lines of a whole document with estimated metrics
#[derive(Debug, Default)]
struct PageLayout {
    lines: Vec<Line>,
    width: f32,
    height: f32,
}

impl PageLayout {
    fn of(document: &StructuredTextDocument) -> Self {
        let mut layout = Self::default();
        let mut y = PADDING;
        let mut ordinal = 0usize;

        for block in document.blocks() {
            let (size, block_bold) = match block.kind {
                BlockKind::Heading(level) => (heading_size(level), true),
                _ => (BODY_SIZE, false),
            };
            let mut x = PADDING;
            let mut prefix = None;
            match block.kind {
                BlockKind::ListItem { ordered } => {
                    x += LIST_INDENT;
                    ordinal = if ordered { ordinal + 1 } else { 0 };
                    prefix = Some(if ordered {
                        format!("{}. ", ordinal)
                    } else {
                        "\u{2022} ".to_string()
                    });
                }
                _ => ordinal = 0,
            }

            let max_width = MAX_LINE_WIDTH - (x - PADDING);
            let mut lines = vec![Line::new(x, size)];
            if let Some(prefix) = prefix {
                let style = RunStyle {
                    bold: block_bold,
                    ..RunStyle::default()
                };
                lines[0].push(&prefix, style);
            }

            for run in &block.runs {
                let style = RunStyle {
                    bold: run.style.bold || block_bold,
                    ..run.style
                };
                for (i, hard_line) in run.text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Line::new(x, size));
                    }
                    for word in hard_line.split_inclusive(char::is_whitespace) {
                        let Some(line) = lines.last_mut() else {
                            continue;
                        };
                        let word_width = estimate_width(word.trim_end(), size, style.bold);
                        if !line.is_blank() && line.width + word_width > max_width {
                            line.trim_end();
                            lines.push(Line::new(x, size));
                            if word.trim().is_empty() {
                                continue;
                            }
                        }
                        if let Some(line) = lines.last_mut() {
                            line.push(word, style);
                        }
                    }
                }
            }

            let line_height = size * LINE_HEIGHT;
            for mut line in lines {
                line.trim_end();
                line.baseline = y + size;
                y += line_height;
                layout.width = layout.width.max(line.x + line.width);
                if !line.pieces.is_empty() {
                    layout.lines.push(line);
                }
            }
            y += size * 0.5;
        }

        layout.width = layout.width.max(PADDING) + PADDING;
        layout.height = y + PADDING;
        layout
    }

    fn to_canvas(&self) -> SvgCanvas {
        let mut canvas = SvgCanvas::new(self.width.ceil(), self.height.ceil());
        for line in &self.lines {
            canvas.push(&line.to_svg());
        }
        canvas
    }
}

/// High-fidelity capture of the styled text
#[derive(Debug, Default, Clone, Copy)]
pub struct FidelityCapture;

impl FidelityCapture {
    async fn capture(
        &self,
        html: &str,
        ctx: &RasterContext<'_>,
    ) -> Result<RasterArtifact, RasterError> {
        let document = StructuredTextDocument::from_html(html);
        let fonts = settled_system_fonts(ctx.options.settle_timeout()).await?;

        let layout = PageLayout::of(&document);
        let mut canvas = layout.to_canvas();
        let (width, height) = match content_extent(&canvas.to_svg(), fonts.clone())? {
            Some((right, bottom)) => (
                (right + PADDING).ceil(),
                (bottom + PADDING).max(layout.height).ceil(),
            ),
            None => (layout.width.ceil(), layout.height.ceil()),
        };
        debug!(
            "Text laid out in {} lines, natural size {}x{}",
            layout.lines.len(),
            width,
            height
        );
        canvas.set_size(width, height);

        let scale = if ctx.options.supersample.is_finite() && ctx.options.supersample > 0.0 {
            ctx.options.supersample
        } else {
            1.0
        };
        let (png, px_width, px_height) = render_png(&canvas.to_svg(), fonts, scale)?;
        Ok(RasterArtifact::from_png(png, px_width, px_height, ctx))
    }
}

impl RasterStrategy for FidelityCapture {
    fn name(&self) -> &'static str {
        "fidelity-capture"
    }

    fn rasterize<'a>(
        &'a self,
        payload: &'a PrescriptionPayload,
        ctx: &'a RasterContext<'a>,
    ) -> BoxFuture<'a, Result<RasterArtifact, RasterError>> {
        async move {
            match payload {
                PrescriptionPayload::Text { html, .. } => self.capture(html, ctx).await,
                other => Err(RasterError::UnsupportedPayload {
                    strategy: self.name(),
                    kind: other.kind(),
                }),
            }
        }
        .boxed()
    }
}
