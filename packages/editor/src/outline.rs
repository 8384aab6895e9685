//! Expand/collapse state of the layer outline.

use crate::store::{Dispatch, Reducer};
use serde::Serialize;
use std::collections::BTreeSet;
use std::convert::Infallible;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutlineState {
    expanded: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineAction {
    Expand(String),
    Collapse(String),
    Toggle(String),
    /// Expand every ancestor of a node so it becomes visible.
    Reveal { ancestors: Vec<String> },
    /// Forget ids that no longer exist after a re-parse.
    Retain { ids: Vec<String> },
    CollapseAll,
}

impl OutlineState {
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }
}

impl Reducer for OutlineState {
    type Action = OutlineAction;
    type Effect = Infallible;

    fn reduce(&mut self, action: OutlineAction) -> Dispatch<Infallible> {
        let changed = match action {
            OutlineAction::Expand(id) => self.expanded.insert(id),
            OutlineAction::Collapse(id) => self.expanded.remove(&id),
            OutlineAction::Toggle(id) => {
                if !self.expanded.remove(&id) {
                    self.expanded.insert(id);
                }
                true
            }
            OutlineAction::Reveal { ancestors } => {
                let mut changed = false;
                for id in ancestors {
                    changed |= self.expanded.insert(id);
                }
                changed
            }
            OutlineAction::Retain { ids } => {
                let keep: BTreeSet<String> = ids.into_iter().collect();
                let before = self.expanded.len();
                self.expanded.retain(|id| keep.contains(id));
                self.expanded.len() != before
            }
            OutlineAction::CollapseAll => {
                let changed = !self.expanded.is_empty();
                self.expanded.clear();
                changed
            }
        };
        Dispatch::changed(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_reveal() {
        let mut outline = OutlineState::default();
        outline.reduce(OutlineAction::Toggle("div-0".into()));
        assert!(outline.is_expanded("div-0"));
        outline.reduce(OutlineAction::Toggle("div-0".into()));
        assert!(!outline.is_expanded("div-0"));

        let result = outline.reduce(OutlineAction::Reveal {
            ancestors: vec!["div-0".into(), "section-0.0".into()],
        });
        assert!(result.state_changed);
        assert_eq!(outline.expanded().count(), 2);

        let again = outline.reduce(OutlineAction::Expand("div-0".into()));
        assert!(!again.state_changed);
    }

    #[test]
    fn test_retain() {
        let mut outline = OutlineState::default();
        outline.reduce(OutlineAction::Expand("a-0".into()));
        outline.reduce(OutlineAction::Expand("b-0.0".into()));
        outline.reduce(OutlineAction::Retain {
            ids: vec!["a-0".into()],
        });
        assert_eq!(outline.expanded().collect::<Vec<_>>(), vec!["a-0"]);
    }
}
