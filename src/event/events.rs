use crate::text::TextCounts;

/// Fired after every edit of the structured text surface
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub html: String,
    pub plain: String,
    pub counts: TextCounts,
    /// False when the html is only empty-paragraph artifacts
    pub meaningful: bool,
}

/// What part of the editable root an edit touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Text inside an existing run changed
    CharacterData,
    /// Blocks or runs were inserted, removed, split or merged
    ChildList,
    /// Attributes on the root or a block changed
    Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn new(kind: MutationKind) -> Self {
        Self { kind }
    }
}
