use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseError {
    #[error("No markup tree found: {reason}")]
    NoTree { reason: String },

    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },
}

impl ParseError {
    pub fn no_tree(reason: impl Into<String>) -> Self {
        Self::NoTree {
            reason: reason.into(),
        }
    }

    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn mismatched_closing_tag(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedClosingTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    /// Byte offset the error points at, if it has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::NoTree { .. } => None,
            Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEof { pos, .. }
            | Self::MismatchedClosingTag { pos, .. }
            | Self::InvalidSyntax { pos, .. } => Some(*pos),
        }
    }
}
