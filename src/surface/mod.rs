//! Bitmap-backed freehand drawing surface.
//!
//! Input coordinates are logical units relative to the surface's bounding box.
//! The backing buffer is `logical size * device pixel ratio` pixels.

mod history;
mod stroke;

pub use history::{BitmapSnapshot, UNDO_CAPACITY, UndoStack};
pub use stroke::ActiveStroke;

use egui::{Pos2, Vec2};
use log::debug;
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::data_uri;
use crate::error::SurfaceError;
use crate::input::InputEvent;
use crate::pen::{PenMode, SharedPen};

pub struct DrawingSurface {
    pixmap: Option<Pixmap>,
    device_pixel_ratio: f32,
    logical_size: Vec2,
    undo: UndoStack,
    pen: SharedPen,
    active_stroke: Option<ActiveStroke>,
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("pixel_size", &self.pixel_size())
            .field("device_pixel_ratio", &self.device_pixel_ratio)
            .field("logical_size", &self.logical_size)
            .field("undo_depth", &self.undo.len())
            .field("stroking", &self.active_stroke.is_some())
            .finish()
    }
}

impl DrawingSurface {
    /// Create an uninitialized surface. Nothing can be drawn until the first resize.
    pub fn new(pen: SharedPen) -> Self {
        Self {
            pixmap: None,
            device_pixel_ratio: 1.0,
            logical_size: Vec2::ZERO,
            undo: UndoStack::new(),
            pen,
            active_stroke: None,
        }
    }

    pub fn with_device_pixel_ratio(mut self, device_pixel_ratio: f32) -> Self {
        self.device_pixel_ratio = sanitize_ratio(device_pixel_ratio);
        self
    }

    pub fn pen(&self) -> &SharedPen {
        &self.pen
    }

    pub fn is_initialized(&self) -> bool {
        self.pixmap.is_some()
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn logical_size(&self) -> Vec2 {
        self.logical_size
    }

    /// Backing buffer size in pixels, once initialized
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn is_stroking(&self) -> bool {
        self.active_stroke.is_some()
    }

    /// Whether any pixel in the buffer is non-transparent
    pub fn has_ink(&self) -> bool {
        self.pixmap
            .as_ref()
            .is_some_and(|p| p.pixels().iter().any(|px| px.alpha() > 0))
    }

    /// Reallocate the buffer for a new logical size, keeping what was drawn.
    ///
    /// The old buffer is kept aside at its old pixel size and redrawn scaled to the
    /// new one, so content survives any combination of size and ratio change.
    /// Each call runs to completion before the next one is applied.
    pub fn resize(&mut self, logical_width: f32, logical_height: f32) -> Result<(), SurfaceError> {
        let (width, height) = self.pixel_dimensions(logical_width, logical_height)?;
        let logical_size = Vec2::new(logical_width, logical_height);

        if self.pixel_size() == Some((width, height)) {
            self.logical_size = logical_size;
            self.reapply_pen();
            return Ok(());
        }

        let mut next = Pixmap::new(width, height)
            .ok_or(SurfaceError::InvalidDimensions { width, height })?;

        if let Some(offscreen) = self.pixmap.take() {
            draw_scaled(&mut next, &offscreen);
        }

        debug!(
            "Surface resized to {}x{} logical ({}x{} px @ {}x)",
            logical_width, logical_height, width, height, self.device_pixel_ratio
        );
        self.pixmap = Some(next);
        self.logical_size = logical_size;
        self.reapply_pen();
        Ok(())
    }

    /// Change the device pixel ratio and rerun the resize sequence at the current logical size
    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f32) -> Result<(), SurfaceError> {
        self.device_pixel_ratio = sanitize_ratio(device_pixel_ratio);
        if self.is_initialized() {
            self.resize(self.logical_size.x, self.logical_size.y)?;
        }
        Ok(())
    }

    /// Snapshot the buffer for undo, then start a new path at `point`
    pub fn begin_stroke(&mut self, point: Pos2) {
        if self.active_stroke.is_some() {
            self.end_stroke();
        }
        let Some(pixmap) = &self.pixmap else {
            debug!("Ignoring stroke on an uninitialized surface");
            return;
        };

        self.undo.push(BitmapSnapshot::capture(pixmap));
        let pen = self.pen.read();
        debug!(
            "Stroke started at {:?} ({:?}, width {})",
            point,
            pen.mode(),
            pen.width()
        );
        self.active_stroke = Some(ActiveStroke::begin(point, &pen));
    }

    /// Paint from the previous point to `point`. No-op without an active stroke.
    pub fn continue_stroke(&mut self, point: Pos2) {
        let scale = self.device_pixel_ratio;
        if let (Some(stroke), Some(pixmap)) = (&mut self.active_stroke, &mut self.pixmap) {
            stroke.extend_to(point, pixmap, scale);
        }
    }

    /// Close the current path. No-op without an active stroke.
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.active_stroke.take() {
            debug!("Stroke ended with {} points", stroke.points().len());
        }
    }

    /// Switch the shared pen between painting and clearing
    pub fn set_mode(&mut self, mode: PenMode) {
        self.pen.write().set_mode(mode);
    }

    /// Reset every pixel to transparent. Not undoable.
    pub fn clear(&mut self) {
        self.end_stroke();
        if let Some(pixmap) = &mut self.pixmap {
            pixmap.fill(Color::TRANSPARENT);
        }
    }

    /// Restore the most recent snapshot. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.end_stroke();
        let Some(snapshot) = self.undo.pop() else {
            return false;
        };

        match &mut self.pixmap {
            Some(current)
                if current.width() == snapshot.width() && current.height() == snapshot.height() =>
            {
                *current = snapshot.into_pixmap();
            }
            Some(current) => {
                // Taken before a resize: stretch it into the current buffer
                current.fill(Color::TRANSPARENT);
                draw_scaled(current, snapshot.pixmap());
            }
            None => self.pixmap = Some(snapshot.into_pixmap()),
        }
        debug!("Undo, {} snapshots left", self.undo.len());
        true
    }

    /// Current buffer as PNG, or `None` when the surface was never sized
    pub fn export_png(&self) -> Result<Option<Vec<u8>>, SurfaceError> {
        self.pixmap
            .as_ref()
            .map(|p| p.encode_png().map_err(|e| SurfaceError::Encode(e.to_string())))
            .transpose()
    }

    /// Same as [`Self::export_png`] as a `data:image/png;base64,` URI
    pub fn export_data_uri(&self) -> Result<Option<String>, SurfaceError> {
        Ok(self.export_png()?.map(|png| data_uri::encode_png(&png)))
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::PointerDown { location } if location.is_in_canvas => {
                self.begin_stroke(location.position);
            }
            InputEvent::PointerMove { location } => self.continue_stroke(location.position),
            InputEvent::PointerUp { location } => {
                self.continue_stroke(location.position);
                self.end_stroke();
            }
            InputEvent::PointerLeave => self.end_stroke(),
            _ => {}
        }
    }

    fn reapply_pen(&mut self) {
        if let Some(stroke) = &mut self.active_stroke {
            stroke.restyle(&self.pen.read());
        }
    }

    fn pixel_dimensions(&self, logical_width: f32, logical_height: f32) -> Result<(u32, u32), SurfaceError> {
        let to_pixels = |logical: f32| (logical * self.device_pixel_ratio).round();
        let (width, height) = (to_pixels(logical_width), to_pixels(logical_height));
        if !(width.is_finite() && height.is_finite() && width >= 1.0 && height >= 1.0) {
            return Err(SurfaceError::InvalidDimensions {
                width: width.max(0.0) as u32,
                height: height.max(0.0) as u32,
            });
        }
        Ok((width as u32, height as u32))
    }
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
}

/// Draw `source` stretched over the whole of `target`
fn draw_scaled(target: &mut Pixmap, source: &Pixmap) {
    let sx = target.width() as f32 / source.width() as f32;
    let sy = target.height() as f32 / source.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, source.as_ref(), &paint, Transform::from_scale(sx, sy), None);
}
