use std::sync::Arc;
use tiny_skia::{Color, Pixmap, Transform};
use usvg::fontdb::Database;

use crate::error::RasterError;

/// SVG document under construction, in logical units
pub(crate) struct SvgCanvas {
    width: f32,
    height: f32,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn push(&mut self, element: &str) {
        self.body.push_str(element);
        self.body.push('\n');
    }

    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn parse(svg: &str, fonts: Arc<Database>) -> Result<usvg::Tree, RasterError> {
    let options = usvg::Options {
        fontdb: fonts,
        ..Default::default()
    };
    usvg::Tree::from_str(svg, &options)
        .map_err(|e| RasterError::Capture(format!("Failed to parse SVG: {}", e)))
}

/// Right and bottom edge of everything drawn, in logical units
pub(crate) fn content_extent(svg: &str, fonts: Arc<Database>) -> Result<Option<(f32, f32)>, RasterError> {
    let tree = parse(svg, fonts)?;
    let bbox = tree.root().abs_bounding_box();
    if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
        return Ok(None);
    }
    Ok(Some((bbox.right(), bbox.bottom())))
}

/// Render onto an opaque white page at `scale`. Returns PNG bytes and pixel size.
pub(crate) fn render_png(
    svg: &str,
    fonts: Arc<Database>,
    scale: f32,
) -> Result<(Vec<u8>, u32, u32), RasterError> {
    let tree = parse(svg, fonts)?;
    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        RasterError::Capture(format!("Failed to create {}x{} pixmap", width, height))
    })?;
    pixmap.fill(Color::WHITE);
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok((png, width, height))
}

/// Escape text for use in SVG character data or attributes
pub(crate) fn escape_xml(text: &str) -> String {
    crate::text::escape_html(text).replace('\'', "&apos;")
}
