use std::collections::VecDeque;
use tiny_skia::Pixmap;

/// Maximum number of snapshots kept for undo
pub const UNDO_CAPACITY: usize = 10;

/// Immutable capture of the pixel buffer, tagged with its pixel size
#[derive(Clone)]
pub struct BitmapSnapshot {
    pixels: Pixmap,
}

impl std::fmt::Debug for BitmapSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapSnapshot")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl BitmapSnapshot {
    pub fn capture(pixmap: &Pixmap) -> Self {
        Self {
            pixels: pixmap.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixels
    }

    pub(crate) fn into_pixmap(self) -> Pixmap {
        self.pixels
    }
}

/// Bounded snapshot stack. Oldest entries are evicted first, undo pops the newest.
///
/// There is no redo side: a popped snapshot is gone.
pub struct UndoStack {
    snapshots: VecDeque<BitmapSnapshot>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_capacity(UNDO_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a snapshot, evicting the oldest one when full
    pub fn push(&mut self, snapshot: BitmapSnapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<BitmapSnapshot> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of_width(width: u32) -> BitmapSnapshot {
        BitmapSnapshot::capture(&Pixmap::new(width, 1).unwrap())
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut stack = UndoStack::new();
        for width in 1..=12 {
            stack.push(snapshot_of_width(width));
        }
        assert_eq!(stack.len(), UNDO_CAPACITY);

        // Newest first, and the two oldest (widths 1 and 2) are gone
        let widths: Vec<u32> = std::iter::from_fn(|| stack.pop().map(|s| s.width())).collect();
        assert_eq!(widths, (3..=12).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_pop_on_empty_is_none() {
        let mut stack = UndoStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }
}
