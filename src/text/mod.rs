//! Structured rich-text authoring surface.
//!
//! The document is seeded once, when the surface is created. Later updates to
//! the bound value are kept for preview and counts only, so a parent re-render
//! never resets the caret while the user types.

mod direction;
mod document;

pub use direction::DirectionGuard;
pub use document::{
    Block, BlockKind, Caret, Direction, RootAttributes, Run, RunStyle, StructuredTextDocument,
    TextCounts, detect_direction,
};
pub(crate) use document::escape_html;

use egui::{Color32, Key};
use log::debug;

use crate::event::{
    ChangeEvent, EventBus, EventHandler, MutationKind, MutationRecord, ObserverRegistry,
    SubscriptionId,
};
use crate::input::InputEvent;

pub const DEFAULT_PLACEHOLDER: &str = "Write the prescription...";

#[derive(Debug, Clone, PartialEq)]
pub struct TextSurfaceOptions {
    pub placeholder: String,
    pub read_only: bool,
}

impl Default for TextSurfaceOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            read_only: false,
        }
    }
}

pub struct TextSurface {
    document: StructuredTextDocument,
    caret: Caret,
    typing_style: RunStyle,
    external_value: Option<String>,
    counts: TextCounts,
    preview: bool,
    read_only: bool,
    placeholder: String,
    changes: EventBus<ChangeEvent>,
    observers: ObserverRegistry,
    direction_subscription: Option<SubscriptionId>,
}

impl std::fmt::Debug for TextSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSurface")
            .field("caret", &self.caret)
            .field("counts", &self.counts)
            .field("preview", &self.preview)
            .field("read_only", &self.read_only)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for TextSurface {
    fn default() -> Self {
        Self::new("", TextSurfaceOptions::default())
    }
}

impl Drop for TextSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl TextSurface {
    /// Create the surface and seed it with `initial_html`
    pub fn new(initial_html: &str, options: TextSurfaceOptions) -> Self {
        let mut observers = ObserverRegistry::new();
        let direction_subscription = Some(observers.subscribe(Box::new(DirectionGuard::new())));

        let mut document = StructuredTextDocument::from_html(initial_html);
        DirectionGuard::enforce(&mut document);
        let caret = document.end_caret();
        let counts = document.counts();

        Self {
            document,
            caret,
            typing_style: RunStyle::default(),
            external_value: None,
            counts,
            preview: false,
            read_only: options.read_only,
            placeholder: options.placeholder,
            changes: EventBus::new(),
            observers,
            direction_subscription,
        }
    }

    pub fn document(&self) -> &StructuredTextDocument {
        &self.document
    }

    pub fn html(&self) -> String {
        self.document.to_html()
    }

    pub fn plain_text(&self) -> String {
        self.document.plain_text()
    }

    /// `(html, plain)` projection used when saving
    pub fn projection(&self) -> (String, String) {
        (self.html(), self.plain_text())
    }

    pub fn counts(&self) -> TextCounts {
        self.counts
    }

    pub fn caret(&self) -> Caret {
        self.caret
    }

    pub fn set_caret(&mut self, caret: Caret) {
        self.caret = self.document.clamp_caret(caret);
    }

    pub fn caret_to_end(&mut self) {
        self.caret = self.document.end_caret();
    }

    pub fn typing_style(&self) -> RunStyle {
        self.typing_style
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Switch between the live editor and the read-only rendering. The document is untouched.
    pub fn toggle_preview(&mut self) -> bool {
        self.preview = !self.preview;
        self.preview
    }

    /// HTML shown in preview mode: the bound value when one was set, else the live document
    pub fn preview_html(&self) -> String {
        self.external_value
            .clone()
            .unwrap_or_else(|| self.document.to_html())
    }

    /// Observe a new bound value from the host. Never re-seeds the live document.
    pub fn set_value(&mut self, html: &str) {
        let observed = StructuredTextDocument::from_html(html);
        self.counts = observed.counts();
        self.external_value = Some(html.to_string());
    }

    /// Subscribe to change notifications
    pub fn on_change(&self, handler: impl EventHandler<ChangeEvent> + 'static) -> SubscriptionId {
        self.changes.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Release the direction observer. Further edits are no longer corrected.
    pub fn dispose(&mut self) {
        if let Some(id) = self.direction_subscription.take() {
            self.observers.unsubscribe(id);
            debug!("Text surface disposed");
        }
    }

    pub fn insert_text(&mut self, text: &str) {
        if !self.editable() || text.is_empty() {
            return;
        }
        let (caret, kind) = self.document.insert_text(self.caret, text, self.typing_style);
        self.caret = caret;
        self.commit(kind);
    }

    /// Enter: split the current block
    pub fn insert_paragraph(&mut self) {
        if !self.editable() {
            return;
        }
        self.caret = self.document.split_block(self.caret);
        self.commit(MutationKind::ChildList);
    }

    /// Backspace
    pub fn delete_backward(&mut self) {
        if !self.editable() {
            return;
        }
        if let Some((caret, kind)) = self.document.delete_backward(self.caret) {
            self.caret = caret;
            self.commit(kind);
        }
    }

    pub fn paste_html(&mut self, html: &str) {
        if !self.editable() {
            return;
        }
        let fragment = StructuredTextDocument::from_html(html);
        if fragment.blocks().is_empty() {
            return;
        }
        self.caret = self.document.insert_fragment(self.caret, fragment);
        self.commit(MutationKind::ChildList);
    }

    pub fn paste_text(&mut self, text: &str) {
        self.insert_text(text);
    }

    /// Replace the whole root attribute set, as a host script could
    pub fn set_root_attributes(&mut self, attributes: RootAttributes) {
        if !self.editable() {
            return;
        }
        *self.document.root_mut() = attributes;
        self.commit(MutationKind::Attributes);
    }

    pub fn toggle_bold(&mut self) {
        self.typing_style.bold = !self.typing_style.bold;
    }

    pub fn toggle_italic(&mut self) {
        self.typing_style.italic = !self.typing_style.italic;
    }

    pub fn toggle_underline(&mut self) {
        self.typing_style.underline = !self.typing_style.underline;
    }

    pub fn set_text_color(&mut self, color: Option<Color32>) {
        self.typing_style.color = color;
    }

    pub fn handle_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Text(text) => self.insert_text(text),
            InputEvent::Paste { html: Some(html), .. } => self.paste_html(html),
            InputEvent::Paste { html: None, text } => self.paste_text(text),
            InputEvent::KeyDown { key, modifiers } => match key {
                Key::Enter => self.insert_paragraph(),
                Key::Backspace => self.delete_backward(),
                Key::B if modifiers.command => self.toggle_bold(),
                Key::I if modifiers.command => self.toggle_italic(),
                Key::U if modifiers.command => self.toggle_underline(),
                _ => {}
            },
            _ => {}
        }
    }

    fn editable(&self) -> bool {
        !self.read_only && !self.preview
    }

    fn commit(&mut self, kind: MutationKind) {
        self.observers
            .notify(&MutationRecord::new(kind), &mut self.document);
        self.caret = self.document.clamp_caret(self.caret);

        let html = self.document.to_html();
        let plain = self.document.plain_text();
        self.counts = TextCounts::of(&plain);
        let event = ChangeEvent {
            meaningful: is_meaningful_html(&html),
            html,
            plain,
            counts: self.counts,
        };
        self.changes.emit(&event);
    }
}

/// Remove the empty-paragraph markup editors leave behind
pub fn strip_empty_paragraphs(html: &str) -> String {
    let mut out = html.to_string();
    for artifact in ["<p><br></p>", "<p><br/></p>", "<p><br /></p>", "<p></p>"] {
        out = out.replace(artifact, "");
    }
    out.trim().to_string()
}

/// Whether `html` carries content beyond empty-paragraph artifacts
pub fn is_meaningful_html(html: &str) -> bool {
    !strip_empty_paragraphs(html).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_empty_paragraphs() {
        assert_eq!(strip_empty_paragraphs("<p><br></p>"), "");
        assert_eq!(strip_empty_paragraphs("<p>a</p><p><br></p>"), "<p>a</p>");
        assert!(!is_meaningful_html(" <p></p><p><br/></p> "));
        assert!(is_meaningful_html("<p>x</p>"));
    }

    #[test]
    fn test_counts_on_mount() {
        let surface = TextSurface::new("<p>one two three</p>", TextSurfaceOptions::default());
        assert_eq!(surface.counts(), TextCounts { words: 3, chars: 13 });
    }

    #[test]
    fn test_preview_blocks_edits_without_touching_document() {
        let mut surface = TextSurface::new("<p>Hi</p>", TextSurfaceOptions::default());
        assert!(surface.toggle_preview());
        surface.insert_text("!");
        assert_eq!(surface.html(), "<p>Hi</p>");
        assert!(!surface.toggle_preview());
        surface.insert_text("!");
        assert_eq!(surface.html(), "<p>Hi!</p>");
    }
}
