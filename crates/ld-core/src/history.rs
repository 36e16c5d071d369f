//! Snapshot undo/redo stacks.
//!
//! Each entry is the full serialized text of a diagram. Restoring an entry
//! clears the canvas and re-parses it, O(elements) per step. The same text
//! is what a solution file stores when history is saved.

use serde::{Deserialize, Serialize};

/// Undo and redo stacks of serialized diagram states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    undo: Vec<String>,
    redo: Vec<String>,
    /// Maximum undo depth; `None` is unbounded.
    max_depth: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::default()
        }
    }

    /// Record the state before an edit. Abandons the redo stack.
    pub fn snapshot(&mut self, current: String) {
        self.push_undo(current);
        self.redo.clear();
    }

    /// Push onto the undo stack without touching redo (used when loading
    /// stored history).
    pub fn push_undo(&mut self, text: String) {
        self.undo.push(text);
        if let Some(max) = self.max_depth
            && self.undo.len() > max
        {
            let excess = self.undo.len() - max;
            self.undo.drain(..excess);
        }
    }

    /// Step back: `current` goes to redo, the returned text should be
    /// restored. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: String) -> Option<String> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Mirror of [`History::undo`].
    pub fn redo(&mut self, current: String) -> Option<String> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The entry the next undo returns.
    pub fn peek_undo(&self) -> Option<&str> {
        self.undo.last().map(String::as_str)
    }

    /// The entry the next redo returns.
    pub fn peek_redo(&self) -> Option<&str> {
        self.redo.last().map(String::as_str)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> &[String] {
        &self.undo
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_then_redo() {
        let mut h = History::new();
        h.snapshot("a".into());
        assert_eq!(h.peek_undo(), Some("a"));
        assert_eq!(h.undo("b".into()).as_deref(), Some("a"));
        assert!(h.can_redo());
        assert_eq!(h.peek_redo(), Some("b"));
        assert_eq!(h.redo("a".into()).as_deref(), Some("b"));
        assert_eq!(h.undo_entries(), ["a".to_string()]);
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut h = History::new();
        assert_eq!(h.undo("x".into()), None);
        assert_eq!(h.redo("x".into()), None);
        assert!(!h.can_undo() && !h.can_redo());
    }

    #[test]
    fn snapshot_clears_redo() {
        let mut h = History::new();
        h.snapshot("a".into());
        h.undo("b".into());
        h.snapshot("a".into());
        assert!(!h.can_redo());
        assert_eq!(h.redo("c".into()), None);
    }

    #[test]
    fn depth_drops_oldest() {
        let mut h = History::with_depth(2);
        for s in ["1", "2", "3"] {
            h.snapshot(s.into());
        }
        assert_eq!(h.undo_entries(), ["2".to_string(), "3".to_string()]);
    }
}
