use egui::{Key, Modifiers, Pos2};

/// Represents the location where a pointer event occurred
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputLocation {
    /// Position relative to the drawing surface's bounding box, in logical units
    pub position: Pos2,
    /// Whether this position is within the surface bounds
    pub is_in_canvas: bool,
}

impl InputLocation {
    pub fn inside(position: Pos2) -> Self {
        Self {
            position,
            is_in_canvas: true,
        }
    }
}

/// Input delivered by the host UI to the authoring surfaces.
///
/// Touch input arrives as the same pointer events.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { location: InputLocation },
    PointerMove { location: InputLocation },
    PointerUp { location: InputLocation },
    /// Pointer left the surface while a button may still be held
    PointerLeave,
    /// Typed characters
    Text(String),
    /// Non-character key press (Enter, Backspace, shortcuts)
    KeyDown { key: Key, modifiers: Modifiers },
    /// Clipboard paste, as HTML when the source offered it
    Paste { html: Option<String>, text: String },
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            location: InputLocation::inside(Pos2::new(x, y)),
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            location: InputLocation::inside(Pos2::new(x, y)),
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp {
            location: InputLocation::inside(Pos2::new(x, y)),
        }
    }

    /// Helper to check if a pointer event occurred within the surface
    pub fn is_in_canvas(&self) -> bool {
        match self {
            Self::PointerDown { location }
            | Self::PointerMove { location }
            | Self::PointerUp { location } => location.is_in_canvas,
            _ => false,
        }
    }
}
