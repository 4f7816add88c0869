use egui::{Color32, Pos2};
use prescription_pad::surface::UNDO_CAPACITY;
use prescription_pad::{DrawingSurface, InputEvent, PenConfiguration, PenMode};

fn surface_with_pen(width: u8) -> DrawingSurface {
    let pen = PenConfiguration::new(Color32::BLACK, width, PenMode::Draw).into_shared();
    let mut surface = DrawingSurface::new(pen);
    surface.resize(50.0, 50.0).unwrap();
    surface
}

fn stroke(surface: &mut DrawingSurface, from: (f32, f32), to: (f32, f32)) {
    surface.handle_input(&InputEvent::pointer_down(from.0, from.1));
    surface.handle_input(&InputEvent::pointer_move((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
    surface.handle_input(&InputEvent::pointer_up(to.0, to.1));
}

fn alpha_at(surface: &DrawingSurface, x: u32, y: u32) -> u8 {
    surface.pixmap().unwrap().pixel(x, y).unwrap().alpha()
}

#[test]
fn test_undo_every_stroke_returns_to_blank() {
    let mut surface = surface_with_pen(4);
    for i in 0..5 {
        let y = 5.0 + i as f32 * 8.0;
        stroke(&mut surface, (5.0, y), (45.0, y));
    }
    assert!(surface.has_ink());
    assert_eq!(surface.undo_depth(), 5);

    for _ in 0..5 {
        assert!(surface.undo());
    }
    assert!(!surface.has_ink());

    // One more undo on an empty stack changes nothing
    assert!(!surface.undo());
    assert!(!surface.has_ink());
    assert_eq!(surface.pixel_size(), Some((50, 50)));
}

#[test]
fn test_undo_history_is_capped() {
    let mut surface = surface_with_pen(2);
    for i in 0..UNDO_CAPACITY + 2 {
        let y = 2.0 + i as f32 * 4.0;
        stroke(&mut surface, (5.0, y), (45.0, y));
    }
    assert_eq!(surface.undo_depth(), UNDO_CAPACITY);

    let mut undone = 0;
    while surface.undo() {
        undone += 1;
    }
    assert_eq!(undone, UNDO_CAPACITY);
    // The two oldest strokes can no longer be undone
    assert!(surface.has_ink());
}

#[test]
fn test_erase_leaves_transparent_pixels() {
    let mut surface = surface_with_pen(10);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));
    assert_eq!(alpha_at(&surface, 25, 25), 255);

    surface.set_mode(PenMode::Erase);
    surface.pen().write().set_width(20);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));
    assert_eq!(alpha_at(&surface, 25, 25), 0);
}

#[test]
fn test_resize_preserves_drawing() {
    let mut surface = surface_with_pen(10);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));

    surface.resize(100.0, 100.0).unwrap();
    assert_eq!(surface.pixel_size(), Some((100, 100)));
    assert!(alpha_at(&surface, 50, 50) > 0);

    // Same size again is a no-op
    surface.resize(100.0, 100.0).unwrap();
    assert!(alpha_at(&surface, 50, 50) > 0);
}

#[test]
fn test_pen_changes_apply_to_next_stroke() {
    let mut surface = surface_with_pen(10);
    surface.pen().write().set_color(Color32::from_rgb(255, 0, 0));
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));

    let px = surface.pixmap().unwrap().pixel(25, 25).unwrap();
    assert_eq!((px.red(), px.green(), px.blue()), (255, 0, 0));
}

#[test]
fn test_pointer_leave_ends_stroke() {
    let mut surface = surface_with_pen(4);
    surface.handle_input(&InputEvent::pointer_down(5.0, 5.0));
    assert!(surface.is_stroking());
    surface.handle_input(&InputEvent::PointerLeave);
    assert!(!surface.is_stroking());

    let before = surface.pixmap().unwrap().clone();
    surface.continue_stroke(Pos2::new(40.0, 40.0));
    assert_eq!(surface.pixmap().unwrap().data(), before.data());
}

#[test]
fn test_clear_is_not_undoable() {
    let mut surface = surface_with_pen(4);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));
    surface.clear();
    assert!(!surface.has_ink());
    assert_eq!(surface.undo_depth(), 1);
    // Undo restores the pre-stroke snapshot, which is blank
    assert!(surface.undo());
    assert!(!surface.has_ink());
}

#[test]
fn test_undo_after_resize_keeps_current_size() {
    let mut surface = surface_with_pen(10);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));

    surface.resize(100.0, 100.0).unwrap();
    assert!(surface.has_ink());

    // The pre-stroke snapshot is 50x50 and gets stretched into the 100x100 buffer
    assert!(surface.undo());
    assert!(!surface.has_ink());
    assert_eq!(surface.pixel_size(), Some((100, 100)));
}

#[test]
fn test_ratio_change_keeps_drawing_and_undo() {
    let mut surface = surface_with_pen(10);
    stroke(&mut surface, (5.0, 25.0), (45.0, 25.0));

    surface.set_device_pixel_ratio(3.0).unwrap();
    assert_eq!(surface.pixel_size(), Some((150, 150)));
    assert!(surface.has_ink());
    assert!(alpha_at(&surface, 75, 75) > 0);

    assert!(surface.undo());
    assert!(!surface.has_ink());
    assert_eq!(surface.pixel_size(), Some((150, 150)));
}

#[test]
fn test_tap_leaves_a_dot() {
    let mut surface = surface_with_pen(10);
    surface.handle_input(&InputEvent::pointer_down(25.0, 25.0));
    surface.handle_input(&InputEvent::pointer_up(25.0, 25.0));

    assert_eq!(alpha_at(&surface, 25, 25), 255);
    assert_eq!(alpha_at(&surface, 40, 40), 0);
    assert_eq!(surface.undo_depth(), 1);
}
