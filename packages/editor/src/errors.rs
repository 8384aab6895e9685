//! Error types for the editor

use sculpt_parser::ParseError;
use serde::Serialize;
use thiserror::Error;

/// Broad class of a failed mutation, for callers deciding how to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The source has no editable tree (yet).
    Parse,
    /// An id is absent from the current parse; re-sync and retry.
    Reference,
    /// The edit itself is structurally invalid.
    Mutation,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Source has no markup tree: {0}")]
    NoTree(ParseError),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Prop `{prop}` not found on {node_id}")]
    PropNotFound { node_id: String, prop: String },

    #[error("Invalid fragment: {0}")]
    InvalidFragment(ParseError),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Node {0} does not hold editable text")]
    NotText(String),

    #[error("Node {0} is not an element")]
    NotAnElement(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::NoTree(_) => ErrorKind::Parse,
            MutationError::NodeNotFound(_) => ErrorKind::Reference,
            _ => ErrorKind::Mutation,
        }
    }
}
