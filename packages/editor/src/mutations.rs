//! # Mutations
//!
//! Structural edit intents addressed by node id.
//!
//! ## Mutation Semantics
//!
//! ### Move
//! - Removal at the old position plus insertion at the new one, both
//!   computed against the same parse
//! - Moving to the current position is a no-op and leaves the source alone
//! - Fails if the destination lies inside the moved node
//!
//! ### SetText / SetProp / DeleteProp / Replace
//! - Rewrite exactly the value, attribute or node span
//!
//! ### Insert / Duplicate
//! - Fragments are node source text and must parse to exactly one node
//!
//! ### Batches
//! - Applied one node at a time against the already-mutated source,
//!   deepest and rightmost nodes first

use sculpt_parser::PropValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    After,
    Inside,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Mutation {
    Move {
        node_id: String,
        target_id: String,
        position: Position,
    },
    Delete {
        node_id: String,
    },
    DeleteMany {
        node_ids: Vec<String>,
    },
    SetText {
        node_id: String,
        text: String,
    },
    SetProp {
        node_id: String,
        prop_name: String,
        value: PropValue,
    },
    DeleteProp {
        node_id: String,
        prop_name: String,
    },
    Insert {
        parent_id: String,
        index: usize,
        fragment: String,
    },
    InsertMany {
        parent_id: String,
        index: usize,
        fragments: Vec<String>,
    },
    Duplicate {
        node_id: String,
    },
    DuplicateMany {
        node_ids: Vec<String>,
    },
    Replace {
        node_id: String,
        fragment: String,
    },
}

impl Mutation {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Move { .. } => "move",
            Mutation::Delete { .. } => "delete",
            Mutation::DeleteMany { .. } => "delete-many",
            Mutation::SetText { .. } => "set-text",
            Mutation::SetProp { .. } => "set-prop",
            Mutation::DeleteProp { .. } => "delete-prop",
            Mutation::Insert { .. } => "insert",
            Mutation::InsertMany { .. } => "insert-many",
            Mutation::Duplicate { .. } => "duplicate",
            Mutation::DuplicateMany { .. } => "duplicate-many",
            Mutation::Replace { .. } => "replace",
        }
    }

    /// Every node id the mutation refers to.
    pub fn referenced_ids(&self) -> Vec<&str> {
        match self {
            Mutation::Move { node_id, target_id, .. } => vec![node_id.as_str(), target_id.as_str()],
            Mutation::Delete { node_id }
            | Mutation::SetText { node_id, .. }
            | Mutation::SetProp { node_id, .. }
            | Mutation::DeleteProp { node_id, .. }
            | Mutation::Duplicate { node_id }
            | Mutation::Replace { node_id, .. } => vec![node_id.as_str()],
            Mutation::DeleteMany { node_ids } | Mutation::DuplicateMany { node_ids } => {
                node_ids.iter().map(String::as_str).collect()
            }
            Mutation::Insert { parent_id, .. } | Mutation::InsertMany { parent_id, .. } => {
                vec![parent_id.as_str()]
            }
        }
    }
}

/// Result of applying a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub source: String,
    /// True when nothing needed to change (a move onto the node's own spot,
    /// or an empty batch). The source is returned untouched.
    pub noop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::Move {
            node_id: "p-0.0".to_string(),
            target_id: "h1-0.0".to_string(),
            position: Position::Before,
        };

        let json = serde_json::to_string(&mutation).unwrap();
        assert_eq!(
            json,
            r#"{"type":"move","nodeId":"p-0.0","targetId":"h1-0.0","position":"before"}"#
        );
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_set_prop_from_json() {
        let json = r#"{"type":"set-prop","nodeId":"div-0","propName":"title","value":{"type":"string","value":"Hi"}}"#;
        let mutation: Mutation = serde_json::from_str(json).unwrap();
        assert_eq!(
            mutation,
            Mutation::SetProp {
                node_id: "div-0".to_string(),
                prop_name: "title".to_string(),
                value: PropValue::String("Hi".to_string()),
            }
        );
    }

    #[test]
    fn test_referenced_ids() {
        let mutation = Mutation::DeleteMany {
            node_ids: vec!["a-0".to_string(), "b-0".to_string()],
        };
        assert_eq!(mutation.referenced_ids(), vec!["a-0", "b-0"]);
        assert_eq!(mutation.name(), "delete-many");
    }
}
