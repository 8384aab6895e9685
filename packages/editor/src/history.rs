//! # Undo/Redo History
//!
//! Snapshots of `{source, selection}` taken before each mutation.
//!
//! ## Design
//!
//! - Entries are whole sources, so undo never has to invert a mutation
//! - `past` and `future` are bounded deques; pushing at capacity evicts the
//!   oldest past entry
//! - Any new push clears `future`
//! - Restoring the source is the caller's job; the history only hands the
//!   entry back

use crate::interaction::Selection;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub source: String,
    pub selection: Selection,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn at(source: impl Into<String>, selection: Selection, timestamp: i64) -> Self {
        Self {
            source: source.into(),
            selection,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    past: VecDeque<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    #[serde(skip)]
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// A limit of zero is treated as one; history that holds nothing would
    /// turn every undo into a no-op.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record the state about to be replaced by a mutation.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.past.len() == self.limit {
            self.past.pop_front();
        }
        self.past.push_back(entry);
        self.future.clear();
    }

    /// Step back. `current` is what the caller shows right now and becomes
    /// the redo target.
    pub fn undo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.past.pop_back()?;
        push_bounded(&mut self.future, current, self.limit);
        Some(entry)
    }

    pub fn redo(&mut self, current: HistoryEntry) -> Option<HistoryEntry> {
        let entry = self.future.pop_back()?;
        push_bounded(&mut self.past, current, self.limit);
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    if stack.len() == limit {
        stack.pop_front();
    }
    stack.push_back(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str) -> HistoryEntry {
        HistoryEntry::at(source, Selection::default(), 0)
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::default();
        history.push(entry("v1"));

        let undone = history.undo(entry("v2")).unwrap();
        assert_eq!(undone.source, "v1");
        assert!(history.can_redo());

        let redone = history.redo(entry("v1")).unwrap();
        assert_eq!(redone.source, "v2");
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_future() {
        let mut history = History::default();
        history.push(entry("v1"));
        history.undo(entry("v2"));
        history.push(entry("v1"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_bounded() {
        let mut history = History::with_limit(3);
        for i in 0..5 {
            history.push(entry(&format!("v{}", i)));
        }
        assert_eq!(history.past_len(), 3);

        let mut sources = Vec::new();
        while let Some(e) = history.undo(entry("current")) {
            sources.push(e.source);
        }
        assert_eq!(sources, vec!["v4", "v3", "v2"]);
    }

    #[test]
    fn test_empty_undo() {
        let mut history = History::default();
        assert!(history.undo(entry("v1")).is_none());
        assert!(!history.can_redo());
    }
}
