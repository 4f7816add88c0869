use egui::{Color32, ColorImage, Event, Key, Pos2, Rect, RichText, Sense, TextureOptions};
use log::warn;

use crate::PrescriptionApp;
use crate::capture::CaptureMode;
use crate::input::{InputEvent, InputLocation};
use crate::text::{Block, BlockKind, StructuredTextDocument};

pub fn central_panel(app: &mut PrescriptionApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| match app.session.mode() {
        CaptureMode::Draw => drawing_canvas(app, ui),
        CaptureMode::Type => text_view(app, ui),
    });
}

fn drawing_canvas(app: &mut PrescriptionApp, ui: &mut egui::Ui) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let rect = response.rect;

    let drawing = app.session.drawing_mut();
    let ratio = ui.ctx().pixels_per_point();
    if drawing.device_pixel_ratio() != ratio {
        if let Err(e) = drawing.set_device_pixel_ratio(ratio) {
            warn!("Failed to apply pixel ratio {}: {}", ratio, e);
        }
        app.canvas_dirty = true;
    }
    if drawing.logical_size() != rect.size() {
        if let Err(e) = drawing.resize(rect.width(), rect.height()) {
            warn!("Failed to resize drawing surface: {}", e);
        }
        app.canvas_dirty = true;
    }

    let local = |pos: Pos2| InputLocation {
        position: (pos - rect.min).to_pos2(),
        is_in_canvas: rect.contains(pos),
    };
    let mut events = Vec::new();
    let was_held = app.pointer_held;
    app.pointer_held = response.is_pointer_button_down_on();
    if app.pointer_held && !was_held {
        // Start where the press landed, not where the drag threshold was crossed
        if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
            events.push(InputEvent::PointerDown { location: local(origin) });
        }
    }
    if let Some(pos) = response.interact_pointer_pos() {
        if response.clicked() && !was_held && events.is_empty() {
            // Pressed and released within one frame
            events.push(InputEvent::PointerDown { location: local(pos) });
        }
        if response.dragged() && !rect.contains(pos) {
            events.push(InputEvent::PointerLeave);
        } else if response.dragged() {
            events.push(InputEvent::PointerMove { location: local(pos) });
        }
        if response.drag_stopped() || response.clicked() {
            events.push(InputEvent::PointerUp { location: local(pos) });
        }
    }
    for event in &events {
        app.session.handle_input(event);
    }
    app.canvas_dirty |= !events.is_empty();

    painter.rect_filled(rect, 0.0, Color32::WHITE);
    let Some(pixmap) = app.session.drawing().pixmap() else {
        return;
    };
    if app.canvas_dirty || app.canvas_texture.is_none() {
        let image = ColorImage::from_rgba_premultiplied(
            [pixmap.width() as usize, pixmap.height() as usize],
            pixmap.data(),
        );
        match &mut app.canvas_texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                app.canvas_texture =
                    Some(ui.ctx().load_texture("drawing-surface", image, TextureOptions::LINEAR));
            }
        }
        app.canvas_dirty = false;
    }
    if let Some(texture) = &app.canvas_texture {
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        painter.image(texture.id(), rect, uv, Color32::WHITE);
    }
}

fn text_view(app: &mut PrescriptionApp, ui: &mut egui::Ui) {
    let text = app.session.text_mut();
    let preview = text.is_preview();

    let frame = egui::Frame::canvas(ui.style()).inner_margin(12.0);
    let response = frame
        .show(ui, |ui| {
            ui.set_min_size(ui.available_size());
            if preview {
                let rendered = StructuredTextDocument::from_html(&text.preview_html());
                render_blocks(ui, rendered.blocks());
            } else if text.document().is_empty() {
                ui.label(RichText::new(text.placeholder()).weak().italics());
            } else {
                render_blocks(ui, text.document().blocks());
            }
        })
        .response
        .interact(Sense::click());

    if response.clicked() {
        response.request_focus();
        text.caret_to_end();
    }
    if !response.has_focus() || preview {
        return;
    }

    let events = ui.input(|i| i.events.clone());
    for event in events {
        let input = match event {
            Event::Text(s) => InputEvent::Text(s),
            Event::Paste(s) => InputEvent::Paste { html: None, text: s },
            Event::Key {
                key,
                pressed: true,
                modifiers,
                ..
            } if matches!(key, Key::Enter | Key::Backspace | Key::B | Key::I | Key::U) => {
                InputEvent::KeyDown { key, modifiers }
            }
            _ => continue,
        };
        app.session.handle_input(&input);
    }
}

fn render_blocks(ui: &mut egui::Ui, blocks: &[Block]) {
    let mut ordinal = 0;
    for block in blocks {
        let size = match block.kind {
            BlockKind::Heading(1) => 28.0,
            BlockKind::Heading(2) => 22.0,
            BlockKind::Heading(_) => 18.0,
            _ => 16.0,
        };
        let prefix = match block.kind {
            BlockKind::ListItem { ordered: true } => {
                ordinal += 1;
                Some(format!("{}. ", ordinal))
            }
            BlockKind::ListItem { ordered: false } => {
                ordinal = 0;
                Some("\u{2022} ".to_string())
            }
            _ => {
                ordinal = 0;
                None
            }
        };

        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            if let Some(prefix) = prefix {
                ui.add_space(24.0);
                ui.label(RichText::new(prefix).size(size));
            }
            for run in &block.runs {
                let mut rich = RichText::new(&run.text).size(size);
                if run.style.bold || matches!(block.kind, BlockKind::Heading(_)) {
                    rich = rich.strong();
                }
                if run.style.italic {
                    rich = rich.italics();
                }
                if run.style.underline {
                    rich = rich.underline();
                }
                if let Some(color) = run.style.color {
                    rich = rich.color(color);
                }
                ui.label(rich);
            }
        });
    }
}
