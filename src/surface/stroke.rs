use egui::{Color32, Pos2};
use tiny_skia::{
    BlendMode, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform,
};

use crate::pen::{PenConfiguration, PenMode};

/// Stroke in progress. Pen settings are frozen when the stroke starts.
#[derive(Debug, Clone)]
pub struct ActiveStroke {
    points: Vec<Pos2>,
    color: Color32,
    width: f32,
    mode: PenMode,
}

impl ActiveStroke {
    pub fn begin(start: Pos2, pen: &PenConfiguration) -> Self {
        Self {
            points: vec![start],
            color: pen.color(),
            width: pen.width() as f32,
            mode: pen.mode(),
        }
    }

    /// Pick up the current pen after the drawing context was rebuilt
    pub fn restyle(&mut self, pen: &PenConfiguration) {
        self.color = pen.color();
        self.width = pen.width() as f32;
        self.mode = pen.mode();
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn mode(&self) -> PenMode {
        self.mode
    }

    pub fn last_point(&self) -> Option<Pos2> {
        self.points.last().copied()
    }

    /// Extend the path and paint the new segment into `pixmap`.
    ///
    /// `scale` maps logical coordinates onto buffer pixels.
    pub fn extend_to(&mut self, point: Pos2, pixmap: &mut Pixmap, scale: f32) {
        let Some(from) = self.last_point() else {
            self.points.push(point);
            return;
        };
        self.points.push(point);
        let transform = Transform::from_scale(scale, scale);

        if from == point {
            // No movement: a tap leaves a round dot the size of the pen
            if let Some(dot) = PathBuilder::from_circle(point.x, point.y, self.width / 2.0) {
                pixmap.fill_path(&dot, &self.paint(), FillRule::Winding, transform, None);
            }
            return;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(from.x, from.y);
        builder.line_to(point.x, point.y);
        let Some(path) = builder.finish() else {
            return;
        };

        pixmap.stroke_path(
            &path,
            &self.paint(),
            &self.stroke_style(),
            transform,
            None,
        );
    }

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        match self.mode {
            PenMode::Draw => {
                paint.set_color_rgba8(self.color.r(), self.color.g(), self.color.b(), 255);
                paint.blend_mode = BlendMode::SourceOver;
            }
            PenMode::Erase => {
                // Clear leaves transparent pixels behind, not white ones
                paint.set_color_rgba8(0, 0, 0, 255);
                paint.blend_mode = BlendMode::Clear;
            }
        }
        paint
    }

    fn stroke_style(&self) -> Stroke {
        Stroke {
            width: self.width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        }
    }
}
