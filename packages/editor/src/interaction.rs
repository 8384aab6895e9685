//! # Interaction State
//!
//! Selection, hover, inline editing, clipboard and history for one editor
//! view, driven by [`UiAction`]s through a pure reducer.
//!
//! Node ids held here are only meaningful for the parse they came from.
//! After every re-parse the host dispatches [`UiAction::Retain`] with the
//! fresh ids so vanished nodes drop out.

use crate::history::{History, HistoryEntry};
use crate::store::{Dispatch, Reducer};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Selected ids in selection order.
    pub ids: IndexSet<String>,
    pub focused: Option<String>,
    /// Fixed end of a shift-extended range.
    pub anchor: Option<String>,
}

impl Selection {
    pub fn single(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            ids: IndexSet::from([id.clone()]),
            focused: Some(id.clone()),
            anchor: Some(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardOp {
    Copy,
    Cut,
}

/// Source text of the copied nodes, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clipboard {
    pub fragments: Vec<String>,
    pub op: ClipboardOp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorUiState {
    pub selection: Selection,
    pub hovered_id: Option<String>,
    pub editing_id: Option<String>,
    pub clipboard: Option<Clipboard>,
    pub history: History,
}

impl EditorUiState {
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: History::with_limit(limit),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Select { id: String, additive: bool },
    SelectMany { ids: Vec<String> },
    /// Select the inclusive span between two ids of `all_ids`, the linear
    /// order of the rendered tree.
    SelectRange {
        from: String,
        to: String,
        all_ids: Vec<String>,
    },
    ClearSelection,
    Hover(Option<String>),
    StartEditing(String),
    StopEditing,
    /// Snapshot `source` and the current selection before a mutation.
    PushHistory { source: String, timestamp: i64 },
    /// `source` is what the caller currently shows; it becomes the redo entry.
    Undo { source: String, timestamp: i64 },
    Redo { source: String, timestamp: i64 },
    SetClipboard { fragments: Vec<String>, op: ClipboardOp },
    ClearClipboard,
    /// A paste happened. A cut clipboard is spent; a copy stays.
    ClipboardConsumed,
    Retain { ids: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    /// The caller must put this source back (and persist it).
    RestoreSource(String),
}

impl Reducer for EditorUiState {
    type Action = UiAction;
    type Effect = UiEffect;

    fn reduce(&mut self, action: UiAction) -> Dispatch<UiEffect> {
        match action {
            UiAction::Select { id, additive } => self.select(id, additive),
            UiAction::SelectMany { ids } => self.select_many(ids),
            UiAction::SelectRange { from, to, all_ids } => self.select_range(&from, &to, &all_ids),
            UiAction::ClearSelection => {
                let changed = !self.selection.is_empty() || self.editing_id.is_some();
                self.selection = Selection::default();
                self.editing_id = None;
                Dispatch::changed(changed)
            }
            UiAction::Hover(id) => {
                let changed = self.hovered_id != id;
                self.hovered_id = id;
                Dispatch::changed(changed)
            }
            UiAction::StartEditing(id) => {
                if self.selection.len() > 1 || self.editing_id.as_deref() == Some(id.as_str()) {
                    return Dispatch::unchanged();
                }
                self.editing_id = Some(id);
                Dispatch::changed(true)
            }
            UiAction::StopEditing => Dispatch::changed(self.editing_id.take().is_some()),
            UiAction::PushHistory { source, timestamp } => {
                self.history
                    .push(HistoryEntry::at(source, self.selection.clone(), timestamp));
                Dispatch::changed(true)
            }
            UiAction::Undo { source, timestamp } => {
                let current = HistoryEntry::at(source, self.selection.clone(), timestamp);
                let entry = self.history.undo(current);
                self.restore(entry)
            }
            UiAction::Redo { source, timestamp } => {
                let current = HistoryEntry::at(source, self.selection.clone(), timestamp);
                let entry = self.history.redo(current);
                self.restore(entry)
            }
            UiAction::SetClipboard { fragments, op } => {
                if fragments.is_empty() {
                    return Dispatch::unchanged();
                }
                self.clipboard = Some(Clipboard { fragments, op });
                Dispatch::changed(true)
            }
            UiAction::ClearClipboard => Dispatch::changed(self.clipboard.take().is_some()),
            UiAction::ClipboardConsumed => match &self.clipboard {
                Some(clipboard) if clipboard.op == ClipboardOp::Cut => {
                    self.clipboard = None;
                    Dispatch::changed(true)
                }
                _ => Dispatch::unchanged(),
            },
            UiAction::Retain { ids } => self.retain(ids),
        }
    }
}

impl EditorUiState {
    fn select(&mut self, id: String, additive: bool) -> Dispatch<UiEffect> {
        if !additive {
            if self.editing_id.as_ref().is_some_and(|editing| *editing != id) {
                self.editing_id = None;
            }
            let selection = Selection::single(id);
            let changed = self.selection != selection;
            self.selection = selection;
            return Dispatch::changed(changed);
        }

        self.editing_id = None;
        if self.selection.ids.shift_remove(&id) {
            if self.selection.focused.as_ref() == Some(&id) {
                self.selection.focused = self.selection.ids.last().cloned();
            }
            if self.selection.anchor.as_ref() == Some(&id) {
                self.selection.anchor = self.selection.focused.clone();
            }
        } else {
            self.selection.ids.insert(id.clone());
            self.selection.focused = Some(id.clone());
            self.selection.anchor = Some(id);
        }
        Dispatch::changed(true)
    }

    fn select_many(&mut self, ids: Vec<String>) -> Dispatch<UiEffect> {
        let ids: IndexSet<String> = ids.into_iter().collect();
        let focused = ids.last().cloned();
        let selection = Selection {
            anchor: ids.first().cloned(),
            focused,
            ids,
        };
        if selection.len() > 1 {
            self.editing_id = None;
        }
        let changed = self.selection != selection;
        self.selection = selection;
        Dispatch::changed(changed)
    }

    fn select_range(&mut self, from: &str, to: &str, all_ids: &[String]) -> Dispatch<UiEffect> {
        let (Some(a), Some(b)) = (
            all_ids.iter().position(|id| id == from),
            all_ids.iter().position(|id| id == to),
        ) else {
            return Dispatch::unchanged();
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let selection = Selection {
            ids: all_ids[lo..=hi].iter().cloned().collect(),
            focused: Some(to.to_string()),
            anchor: Some(from.to_string()),
        };
        if selection.len() > 1 {
            self.editing_id = None;
        }
        let changed = self.selection != selection;
        self.selection = selection;
        Dispatch::changed(changed)
    }

    fn restore(&mut self, entry: Option<HistoryEntry>) -> Dispatch<UiEffect> {
        match entry {
            Some(entry) => {
                self.selection = entry.selection;
                self.editing_id = None;
                Dispatch::changed(true).with_effect(UiEffect::RestoreSource(entry.source))
            }
            None => Dispatch::unchanged(),
        }
    }

    fn retain(&mut self, ids: Vec<String>) -> Dispatch<UiEffect> {
        let live: IndexSet<String> = ids.into_iter().collect();
        let before = self.clone();

        self.selection.ids.retain(|id| live.contains(id));
        let keep = |slot: &mut Option<String>| {
            if slot.as_ref().is_some_and(|id| !live.contains(id)) {
                *slot = None;
            }
        };
        keep(&mut self.selection.focused);
        keep(&mut self.selection.anchor);
        keep(&mut self.hovered_id);
        keep(&mut self.editing_id);
        if self.selection.focused.is_none() {
            self.selection.focused = self.selection.ids.last().cloned();
        }

        Dispatch::changed(*self != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn select(id: &str, additive: bool) -> UiAction {
        UiAction::Select {
            id: id.to_string(),
            additive,
        }
    }

    #[test]
    fn test_select_replaces() {
        let mut state = EditorUiState::default();
        state.reduce(select("a", false));
        state.reduce(select("b", false));
        assert_eq!(state.selection.to_vec(), ids(&["b"]));
        assert_eq!(state.selection.focused.as_deref(), Some("b"));
    }

    #[test]
    fn test_additive_toggle() {
        let mut state = EditorUiState::default();
        state.reduce(select("a", true));
        state.reduce(select("b", true));
        assert_eq!(state.selection.to_vec(), ids(&["a", "b"]));

        state.reduce(select("b", true));
        assert_eq!(state.selection.focused.as_deref(), Some("a"));

        state.reduce(select("a", true));
        assert!(state.selection.is_empty());
        assert_eq!(state.selection.focused, None);
    }

    #[test]
    fn test_select_many_focuses_last() {
        let mut state = EditorUiState::default();
        state.reduce(UiAction::SelectMany { ids: ids(&["a", "b", "c"]) });
        assert_eq!(state.selection.focused.as_deref(), Some("c"));
        assert_eq!(state.selection.len(), 3);
    }

    #[test]
    fn test_select_range() {
        let all = ids(&["a", "b", "c", "d"]);
        let mut state = EditorUiState::default();
        state.reduce(UiAction::SelectRange {
            from: "d".into(),
            to: "b".into(),
            all_ids: all.clone(),
        });
        assert_eq!(state.selection.to_vec(), ids(&["b", "c", "d"]));
        assert_eq!(state.selection.anchor.as_deref(), Some("d"));

        let result = state.reduce(UiAction::SelectRange {
            from: "a".into(),
            to: "zz".into(),
            all_ids: all,
        });
        assert!(!result.state_changed);
        assert_eq!(state.selection.len(), 3);
    }

    #[test]
    fn test_editing_refused_with_multiple_selected() {
        let mut state = EditorUiState::default();
        state.reduce(UiAction::SelectMany { ids: ids(&["a", "b"]) });
        let result = state.reduce(UiAction::StartEditing("a".into()));
        assert!(!result.state_changed);
        assert_eq!(state.editing_id, None);

        state.reduce(select("a", false));
        state.reduce(UiAction::StartEditing("a".into()));
        assert_eq!(state.editing_id.as_deref(), Some("a"));

        state.reduce(UiAction::Hover(Some("b".into())));
        assert_eq!(state.editing_id.as_deref(), Some("a"));
        assert_eq!(state.selection.to_vec(), ids(&["a"]));

        state.reduce(select("b", true));
        assert_eq!(state.editing_id, None);
    }

    #[test]
    fn test_undo_restores_selection_and_emits_source() {
        let mut state = EditorUiState::default();
        state.reduce(select("h1-0.0", false));
        state.reduce(UiAction::PushHistory {
            source: "before".into(),
            timestamp: 1,
        });
        state.reduce(select("p-0.0", false));

        let effects = state
            .reduce(UiAction::Undo {
                source: "after".into(),
                timestamp: 2,
            })
            .effects;
        assert_eq!(effects, vec![UiEffect::RestoreSource("before".into())]);
        assert_eq!(state.selection.to_vec(), ids(&["h1-0.0"]));

        let effects = state
            .reduce(UiAction::Redo {
                source: "before".into(),
                timestamp: 3,
            })
            .effects;
        assert_eq!(effects, vec![UiEffect::RestoreSource("after".into())]);
        assert_eq!(state.selection.to_vec(), ids(&["p-0.0"]));
    }

    #[test]
    fn test_cut_clipboard_is_spent_by_paste() {
        let mut state = EditorUiState::default();
        state.reduce(UiAction::SetClipboard {
            fragments: ids(&["<b />"]),
            op: ClipboardOp::Copy,
        });
        state.reduce(UiAction::ClipboardConsumed);
        assert!(state.clipboard.is_some());

        state.reduce(UiAction::SetClipboard {
            fragments: ids(&["<i />"]),
            op: ClipboardOp::Cut,
        });
        state.reduce(UiAction::ClipboardConsumed);
        assert!(state.clipboard.is_none());
    }

    #[test]
    fn test_retain_drops_vanished_ids() {
        let mut state = EditorUiState::default();
        state.reduce(UiAction::SelectMany { ids: ids(&["a", "b"]) });
        state.reduce(UiAction::Hover(Some("b".into())));

        let result = state.reduce(UiAction::Retain { ids: ids(&["a", "c"]) });
        assert!(result.state_changed);
        assert_eq!(state.selection.to_vec(), ids(&["a"]));
        assert_eq!(state.selection.focused.as_deref(), Some("a"));
        assert_eq!(state.hovered_id, None);
    }
}
