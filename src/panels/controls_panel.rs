use egui::{Button, Slider};

use crate::PrescriptionApp;
use crate::capture::CaptureMode;
use crate::pen::{MAX_PEN_WIDTH, MIN_PEN_WIDTH, PenMode};

pub fn controls_panel(app: &mut PrescriptionApp, ctx: &egui::Context) {
    egui::SidePanel::left("controls_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Prescription");

            ui.horizontal(|ui| {
                ui.label("Patient:");
                ui.text_edit_singleline(&mut app.subject);
            });
            ui.separator();

            ui.horizontal(|ui| {
                for mode in [CaptureMode::Draw, CaptureMode::Type] {
                    if ui
                        .selectable_label(app.session.mode() == mode, mode.label())
                        .clicked()
                    {
                        app.session.set_mode(mode);
                    }
                }
            });
            ui.separator();

            match app.session.mode() {
                CaptureMode::Draw => draw_controls(app, ui),
                CaptureMode::Type => type_controls(app, ui),
            }

            ui.separator();
            if ui.button("Save").clicked() {
                app.save_prescription();
            }
            if !app.status.is_empty() {
                ui.label(app.status.as_str());
            }

            let mut dismiss = false;
            if let Some(artifact) = &app.last_artifact {
                ui.small(format!(
                    "{} ({}x{}, {} bytes)",
                    artifact.suggested_filename(),
                    artifact.width(),
                    artifact.height(),
                    artifact.size()
                ));
                dismiss = ui.button("Dismiss").clicked();
            }
            if dismiss {
                app.dismiss_artifact();
            }
        });
}

fn draw_controls(app: &mut PrescriptionApp, ui: &mut egui::Ui) {
    {
        let mut pen = app.session.pen().write();

        let mut color = pen.color();
        ui.horizontal(|ui| {
            ui.label("Color:");
            if ui.color_edit_button_srgba(&mut color).changed() {
                pen.set_color(color);
            }
        });

        let mut width = pen.width();
        if ui
            .add(Slider::new(&mut width, MIN_PEN_WIDTH..=MAX_PEN_WIDTH).text("Width"))
            .changed()
        {
            pen.set_width(width);
        }

        ui.horizontal(|ui| {
            for (mode, label) in [(PenMode::Draw, "Pen"), (PenMode::Erase, "Eraser")] {
                if ui.selectable_label(pen.mode() == mode, label).clicked() {
                    log::info!("Pen mode selected from UI: {:?}", mode);
                    pen.set_mode(mode);
                }
            }
        });
    }

    ui.horizontal(|ui| {
        let drawing = app.session.drawing_mut();
        if ui.add_enabled(drawing.can_undo(), Button::new("Undo")).clicked() && drawing.undo() {
            app.canvas_dirty = true;
        }
        if ui.button("Clear").clicked() {
            drawing.clear();
            app.canvas_dirty = true;
        }
    });
    ui.label(format!("Undo stack size: {}", app.session.drawing().undo_depth()));
}

fn type_controls(app: &mut PrescriptionApp, ui: &mut egui::Ui) {
    let text = app.session.text_mut();

    let style = text.typing_style();
    ui.horizontal(|ui| {
        if ui.selectable_label(style.bold, "B").clicked() {
            text.toggle_bold();
        }
        if ui.selectable_label(style.italic, "I").clicked() {
            text.toggle_italic();
        }
        if ui.selectable_label(style.underline, "U").clicked() {
            text.toggle_underline();
        }
    });

    let mut preview = text.is_preview();
    if ui.checkbox(&mut preview, "Preview").changed() {
        text.toggle_preview();
    }
    let mut read_only = text.is_read_only();
    if ui.checkbox(&mut read_only, "Read only").changed() {
        text.set_read_only(read_only);
    }

    let counts = text.counts();
    ui.label(format!("{} words, {} characters", counts.words, counts.chars));
}
