use log::debug;

use crate::event::{MutationObserver, MutationRecord};
use crate::text::document::{Direction, StructuredTextDocument};

/// Keeps the editable root left-to-right with bidi detection off.
///
/// Runs after every mutation of the root, so a flip caused by pasted or typed
/// content is undone inside the same edit.
#[derive(Debug, Default)]
pub struct DirectionGuard {
    corrections: usize,
}

impl DirectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the document left-to-right. Returns true if anything changed.
    pub fn enforce(document: &mut StructuredTextDocument) -> bool {
        let mut changed = false;

        let root = document.root_mut();
        if root.dir != Direction::Ltr || root.auto_bidi {
            root.dir = Direction::Ltr;
            root.auto_bidi = false;
            changed = true;
        }

        for block in document.blocks_mut() {
            if block.dir.is_some() {
                block.dir = None;
                changed = true;
            }
        }
        changed
    }

    pub fn corrections(&self) -> usize {
        self.corrections
    }
}

impl MutationObserver for DirectionGuard {
    fn observe(&mut self, record: &MutationRecord, document: &mut StructuredTextDocument) {
        if Self::enforce(document) {
            self.corrections += 1;
            debug!("Direction reset to ltr after {:?} mutation", record.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MutationKind;

    #[test]
    fn test_enforce_clears_block_directions() {
        let mut doc = StructuredTextDocument::from_html("<p dir=\"rtl\">x</p><p dir=\"auto\">y</p>");
        assert!(DirectionGuard::enforce(&mut doc));
        assert_eq!(doc.root().dir, Direction::Ltr);
        assert!(!doc.root().auto_bidi);
        assert!(doc.blocks().iter().all(|b| b.dir.is_none()));
        assert!(!DirectionGuard::enforce(&mut doc));
    }

    #[test]
    fn test_observer_counts_corrections() {
        let mut guard = DirectionGuard::new();
        let mut doc = StructuredTextDocument::from_html("<p>x</p>");
        let record = MutationRecord::new(MutationKind::ChildList);
        guard.observe(&record, &mut doc);
        guard.observe(&record, &mut doc);
        assert_eq!(guard.corrections(), 1);
    }
}
