//! # Edit Session
//!
//! Glue between input, the host-owned stores and one [`Document`].
//!
//! Key presses and clicks become store dispatches plus [`Intent`]s. Intents
//! that touch the source are handed back to the caller, which either runs
//! them through [`EditSession::commit`] or through its own sync layer and
//! then reports the new source with [`EditSession::set_source`] and the
//! applied mutation with [`EditSession::mutation_committed`].

use crate::document::Document;
use crate::engine::MutationEngine;
use crate::errors::MutationError;
use crate::interaction::{ClipboardOp, EditorUiState, UiAction, UiEffect};
use crate::keymap::{command_for, ClickMode, KeyCommand, KeyPress, Modifiers};
use crate::mutations::{Mutation, MutationOutcome};
use crate::outline::{OutlineAction, OutlineState};
use crate::store::Store;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Mutate(Mutation),
    /// Undo/redo produced a source to put back.
    RestoreSource(String),
    /// Open an inline text editor on this node.
    BeginEditing(String),
    /// Enter was pressed while editing; the caller supplies the text to
    /// [`EditSession::commit_text`].
    CommitEditing(String),
    /// Escape with nothing selected.
    Exit,
}

pub struct EditSession {
    document: Document,
    engine: MutationEngine,
    ui: Store<EditorUiState>,
    outline: Store<OutlineState>,
}

impl EditSession {
    pub fn new(
        document: Document,
        engine: MutationEngine,
        ui: Store<EditorUiState>,
        outline: Store<OutlineState>,
    ) -> Self {
        Self {
            document,
            engine,
            ui,
            outline,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn ui(&self) -> &Store<EditorUiState> {
        &self.ui
    }

    pub fn outline(&self) -> &Store<OutlineState> {
        &self.outline
    }

    /// Click on a node. `order` is the linear order of the rendered tree.
    pub fn click(&self, id: &str, modifiers: Modifiers, order: &[String]) {
        let action = match ClickMode::from_modifiers(modifiers) {
            ClickMode::Replace => UiAction::Select {
                id: id.to_string(),
                additive: false,
            },
            ClickMode::Toggle => UiAction::Select {
                id: id.to_string(),
                additive: true,
            },
            ClickMode::Range => {
                let anchor = self.ui.read(|s| {
                    s.selection
                        .anchor
                        .clone()
                        .or_else(|| s.selection.focused.clone())
                });
                match anchor {
                    Some(from) => UiAction::SelectRange {
                        from,
                        to: id.to_string(),
                        all_ids: order.to_vec(),
                    },
                    None => UiAction::Select {
                        id: id.to_string(),
                        additive: false,
                    },
                }
            }
        };
        self.ui.dispatch(action);
        self.reveal(id);
    }

    pub fn handle_key(&self, press: KeyPress, order: &[String]) -> Vec<Intent> {
        let Some(command) = command_for(press) else {
            return Vec::new();
        };
        let state = self.ui.state();
        let editing = state.editing_id.clone();
        let selected = state.selection.to_vec();
        let focused = state.selection.focused.clone();

        // An open inline editor owns every key but enter and escape
        if editing.is_some() && !matches!(command, KeyCommand::Enter | KeyCommand::Escape) {
            return Vec::new();
        }
        debug!(?command, selected = selected.len(), "key command");

        match command {
            KeyCommand::DeleteSelection => delete_intent(selected).into_iter().collect(),
            KeyCommand::SelectAll => {
                self.ui.dispatch(UiAction::SelectMany { ids: order.to_vec() });
                Vec::new()
            }
            KeyCommand::Copy => {
                self.capture_clipboard(&selected, ClipboardOp::Copy);
                Vec::new()
            }
            KeyCommand::Cut => {
                // Fragments are captured before the originals go
                if !self.capture_clipboard(&selected, ClipboardOp::Cut) {
                    return Vec::new();
                }
                delete_intent(selected).into_iter().collect()
            }
            KeyCommand::Paste => self.paste_intent(focused.as_deref()).into_iter().collect(),
            KeyCommand::Undo => self.history_step(true),
            KeyCommand::Redo => self.history_step(false),
            KeyCommand::Duplicate => match selected.len() {
                0 => Vec::new(),
                1 => vec![Intent::Mutate(Mutation::Duplicate {
                    node_id: selected[0].clone(),
                })],
                _ => vec![Intent::Mutate(Mutation::DuplicateMany { node_ids: selected })],
            },
            KeyCommand::SelectPrevious | KeyCommand::SelectNext => {
                let forward = command == KeyCommand::SelectNext;
                if let Some(id) = step(order, focused.as_deref(), forward) {
                    self.click(&id, Modifiers::NONE, order);
                }
                Vec::new()
            }
            KeyCommand::ExtendPrevious | KeyCommand::ExtendNext => {
                let forward = command == KeyCommand::ExtendNext;
                if let Some(id) = step(order, focused.as_deref(), forward) {
                    self.click(&id, Modifiers::SHIFT, order);
                }
                Vec::new()
            }
            KeyCommand::Enter => match (editing, focused) {
                (Some(id), _) => vec![Intent::CommitEditing(id)],
                (None, Some(id)) if selected.len() == 1 && self.document.supports_text(&id) => {
                    self.ui.dispatch(UiAction::StartEditing(id.clone()));
                    vec![Intent::BeginEditing(id)]
                }
                _ => Vec::new(),
            },
            KeyCommand::Escape => {
                if editing.is_some() {
                    self.ui.dispatch(UiAction::StopEditing);
                    Vec::new()
                } else if !selected.is_empty() {
                    self.ui.dispatch(UiAction::ClearSelection);
                    Vec::new()
                } else {
                    vec![Intent::Exit]
                }
            }
        }
    }

    /// Record the current source and selection ahead of a mutation.
    pub fn record_history(&self) {
        self.ui.dispatch(UiAction::PushHistory {
            source: self.document.source().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
    }

    /// Apply a mutation to the local document, recording history first.
    /// No-ops leave history alone.
    pub fn commit(&mut self, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
        let before = self.document.source().to_string();
        let outcome = self.document.apply(&self.engine, mutation)?;
        if !outcome.noop {
            self.ui.dispatch(UiAction::PushHistory {
                source: before,
                timestamp: chrono::Utc::now().timestamp_millis(),
            });
            self.retain_live_ids();
        }
        self.mutation_committed(mutation);
        Ok(outcome)
    }

    /// A mutation reached the source. A pasted cut clipboard is spent only
    /// here, so a paste that fails keeps it.
    pub fn mutation_committed(&self, mutation: &Mutation) {
        let Mutation::InsertMany { fragments, .. } = mutation else {
            return;
        };
        let pasted = self.ui.read(|s| {
            s.clipboard
                .as_ref()
                .map_or(false, |clipboard| clipboard.fragments == *fragments)
        });
        if pasted {
            self.ui.dispatch(UiAction::ClipboardConsumed);
        }
    }

    /// Finish the inline edit on `node_id` with `text`.
    pub fn commit_text(&mut self, node_id: &str, text: &str) -> Result<MutationOutcome, MutationError> {
        let result = self.commit(&Mutation::SetText {
            node_id: node_id.to_string(),
            text: text.to_string(),
        });
        self.ui.dispatch(UiAction::StopEditing);
        result
    }

    /// The source changed elsewhere (poll, undo, another session).
    pub fn set_source(&mut self, source: impl Into<String>) {
        if self.document.set_source(source) {
            self.retain_live_ids();
        }
    }

    fn retain_live_ids(&self) {
        let ids = self.document.all_ids();
        self.ui.dispatch(UiAction::Retain { ids: ids.clone() });
        self.outline.dispatch(OutlineAction::Retain { ids });
    }

    fn reveal(&self, id: &str) {
        let ancestors = self.document.ancestors(id);
        if !ancestors.is_empty() {
            self.outline.dispatch(OutlineAction::Reveal { ancestors });
        }
    }

    fn capture_clipboard(&self, selected: &[String], op: ClipboardOp) -> bool {
        let fragments: Vec<String> = selected
            .iter()
            .filter_map(|id| self.document.fragment(id))
            .map(str::to_string)
            .collect();
        if fragments.is_empty() {
            return false;
        }
        self.ui.dispatch(UiAction::SetClipboard { fragments, op });
        true
    }

    /// Paste after the focused node, or at the end of the root.
    fn paste_intent(&self, focused: Option<&str>) -> Option<Intent> {
        let clipboard = self.ui.read(|s| s.clipboard.clone())?;
        let root = self.document.root()?;
        let (parent_id, index) = match focused.and_then(|id| root.parent_of(id)) {
            Some((parent, index)) => (parent.id.clone(), index + 1),
            None => (root.id.clone(), root.children.len()),
        };
        Some(Intent::Mutate(Mutation::InsertMany {
            parent_id,
            index,
            fragments: clipboard.fragments,
        }))
    }

    fn history_step(&self, undo: bool) -> Vec<Intent> {
        let source = self.document.source().to_string();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let action = if undo {
            UiAction::Undo { source, timestamp }
        } else {
            UiAction::Redo { source, timestamp }
        };
        self.ui
            .dispatch(action)
            .into_iter()
            .map(|effect| match effect {
                UiEffect::RestoreSource(source) => Intent::RestoreSource(source),
            })
            .collect()
    }
}

fn delete_intent(selected: Vec<String>) -> Option<Intent> {
    match selected.len() {
        0 => None,
        1 => Some(Intent::Mutate(Mutation::Delete {
            node_id: selected.into_iter().next()?,
        })),
        _ => Some(Intent::Mutate(Mutation::DeleteMany { node_ids: selected })),
    }
}

/// Neighbour of `focused` in `order`; the first or last id when nothing is
/// focused. Stops at the ends.
fn step(order: &[String], focused: Option<&str>, forward: bool) -> Option<String> {
    let position = focused.and_then(|id| order.iter().position(|o| o == id));
    let index = match (position, forward) {
        (None, true) => 0,
        (None, false) => order.len().checked_sub(1)?,
        (Some(i), true) => (i + 1).min(order.len() - 1),
        (Some(i), false) => i.saturating_sub(1),
    };
    order.get(index).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Key;

    const SOURCE: &str = "export default () => <div><h1>Title</h1><p>Body</p></div>;";

    fn session() -> EditSession {
        EditSession::new(
            Document::from_source(SOURCE),
            MutationEngine::default(),
            Store::default(),
            Store::default(),
        )
    }

    fn order(session: &EditSession) -> Vec<String> {
        session.document().ids_in_order()
    }

    fn key(c: char) -> KeyPress {
        KeyPress::new(Key::Char(c), Modifiers::PRIMARY)
    }

    #[test]
    fn test_click_modes() {
        let session = session();
        let order = order(&session);
        session.click("h1-0.0", Modifiers::NONE, &order);
        session.click("p-0.0", Modifiers::SHIFT, &order);
        assert_eq!(session.ui().state().selection.to_vec(), vec!["h1-0.0", "p-0.0"]);

        session.click("h1-0.0", Modifiers::PRIMARY, &order);
        assert_eq!(session.ui().state().selection.to_vec(), vec!["p-0.0"]);
        assert!(session.outline().state().is_expanded("div-0"));
    }

    #[test]
    fn test_delete_key_then_undo() {
        let mut session = session();
        let order = order(&session);
        session.click("h1-0.0", Modifiers::NONE, &order);

        let intents = session.handle_key(KeyPress::plain(Key::Delete), &order);
        let [Intent::Mutate(mutation)] = intents.as_slice() else {
            panic!("expected a mutation, got {:?}", intents);
        };
        session.commit(mutation).unwrap();
        assert!(!session.document().source().contains("<h1>"));
        assert!(session.ui().state().selection.is_empty());

        let intents = session.handle_key(key('z'), &order);
        assert_eq!(intents, vec![Intent::RestoreSource(SOURCE.to_string())]);
        assert_eq!(session.ui().state().selection.to_vec(), vec!["h1-0.0"]);
    }

    #[test]
    fn test_cut_and_paste() {
        let mut session = session();
        let order = order(&session);
        session.click("h1-0.0", Modifiers::NONE, &order);

        let intents = session.handle_key(key('x'), &order);
        assert_eq!(
            intents,
            vec![Intent::Mutate(Mutation::Delete {
                node_id: "h1-0.0".to_string()
            })]
        );
        assert_eq!(
            session.ui().state().clipboard.unwrap().fragments,
            vec!["<h1>Title</h1>".to_string()]
        );

        session.click("p-0.0", Modifiers::NONE, &order);
        let intents = session.handle_key(key('v'), &order);
        assert_eq!(
            intents,
            vec![Intent::Mutate(Mutation::InsertMany {
                parent_id: "div-0".to_string(),
                index: 2,
                fragments: vec!["<h1>Title</h1>".to_string()],
            })]
        );
        assert!(session.ui().state().clipboard.is_some());

        let [Intent::Mutate(paste)] = intents.as_slice() else {
            panic!("expected a paste, got {:?}", intents);
        };
        session.commit(paste).unwrap();
        assert!(session.ui().state().clipboard.is_none());
    }

    #[test]
    fn test_failed_paste_keeps_clipboard() {
        let mut session = session();
        let order = order(&session);
        session.click("h1-0.0", Modifiers::NONE, &order);
        session.handle_key(key('x'), &order);

        let intents = session.handle_key(key('v'), &order);
        let [Intent::Mutate(paste)] = intents.as_slice() else {
            panic!("expected a paste, got {:?}", intents);
        };

        // The target parent is gone by the time the paste lands
        session.set_source("export default () => <span />;");
        assert!(session.commit(paste).is_err());
        assert_eq!(
            session.ui().state().clipboard.unwrap().fragments,
            vec!["<h1>Title</h1>".to_string()]
        );
    }

    #[test]
    fn test_enter_and_escape() {
        let mut session = session();
        let order = order(&session);
        session.click("p-0.0", Modifiers::NONE, &order);

        let intents = session.handle_key(KeyPress::plain(Key::Enter), &order);
        assert_eq!(intents, vec![Intent::BeginEditing("p-0.0".to_string())]);
        assert!(session.handle_key(KeyPress::plain(Key::Delete), &order).is_empty());

        let intents = session.handle_key(KeyPress::plain(Key::Enter), &order);
        assert_eq!(intents, vec![Intent::CommitEditing("p-0.0".to_string())]);
        session.commit_text("p-0.0", "Changed").unwrap();
        assert!(session.document().source().contains("<p>Changed</p>"));
        assert_eq!(session.ui().state().editing_id, None);

        let escape = KeyPress::plain(Key::Escape);
        assert!(session.handle_key(escape, &order).is_empty());
        assert!(session.ui().state().selection.is_empty());
        assert_eq!(session.handle_key(escape, &order), vec![Intent::Exit]);
    }

    #[test]
    fn test_arrow_navigation() {
        let session = session();
        let order = order(&session);
        let down = KeyPress::plain(Key::ArrowDown);
        session.handle_key(down, &order);
        session.handle_key(down, &order);
        assert_eq!(session.ui().state().selection.to_vec(), vec!["h1-0.0"]);

        session.handle_key(KeyPress::new(Key::ArrowDown, Modifiers::SHIFT), &order);
        assert_eq!(session.ui().state().selection.to_vec(), vec!["h1-0.0", "p-0.0"]);
    }

    #[test]
    fn test_step_bounds() {
        let order = vec!["a".to_string(), "b".to_string()];
        assert_eq!(step(&order, Some("b"), true).as_deref(), Some("b"));
        assert_eq!(step(&order, Some("a"), false).as_deref(), Some("a"));
        assert_eq!(step(&[], None, false), None);
    }
}
