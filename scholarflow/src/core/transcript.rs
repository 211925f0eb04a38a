//! Append-only conversation transcript shared by the stages of one run.

use super::ConversationItem;

/// The ordered working memory of a single workflow run.
///
/// Appending is the only mutation. Items keep the order in which they were
/// appended and are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    items: Vec<ConversationItem>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript seeded with one user item holding the workflow input.
    #[must_use]
    pub fn seeded(input_text: impl Into<String>) -> Self {
        Self {
            items: vec![ConversationItem::user_text(input_text)],
        }
    }

    /// Appends items in the given order.
    pub fn append(&mut self, items: impl IntoIterator<Item = ConversationItem>) {
        self.items.extend(items);
    }

    /// Returns a read-only copy of the current items.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConversationItem> {
        self.items.clone()
    }

    /// Borrows the current items.
    #[must_use]
    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item at a position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&ConversationItem> {
        self.items.get(position)
    }
}
