//! # Document
//!
//! Source text plus the parse derived from it.
//!
//! The parse is recomputed from scratch on every source change, so node ids
//! handed out by one [`Document`] state are only valid until the next
//! `set_source` or `apply`.
//!
//! ```text
//! set_source / apply
//!        ↓
//!   parse (ids + offsets)
//!        ↓
//! fragment / ancestors / ids_in_order
//! ```

use crate::engine::MutationEngine;
use crate::errors::MutationError;
use crate::mutations::{Mutation, MutationOutcome};
use sculpt_parser::{classify, parse, Node, ParseResult};

#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    parse: ParseResult,
    /// Increments on every change of `source`.
    version: u64,
}

impl Document {
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let parse = parse(&source);
        Self {
            source,
            parse,
            version: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parse(&self) -> &ParseResult {
        &self.parse
    }

    pub fn root(&self) -> Option<&Node> {
        self.parse.root.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the source. Returns false (and keeps the version) when the
    /// text is unchanged.
    pub fn set_source(&mut self, source: impl Into<String>) -> bool {
        let source = source.into();
        if source == self.source {
            return false;
        }
        self.parse = parse(&source);
        self.source = source;
        self.version += 1;
        true
    }

    /// Apply a mutation. A no-op leaves the document (and version) alone.
    pub fn apply(
        &mut self,
        engine: &MutationEngine,
        mutation: &Mutation,
    ) -> Result<MutationOutcome, MutationError> {
        let outcome = engine.apply(&self.source, mutation)?;
        if !outcome.noop {
            self.parse = parse(&outcome.source);
            self.source.clone_from(&outcome.source);
            self.version += 1;
        }
        Ok(outcome)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.parse.find(id)
    }

    /// Exact source text of a node, usable as a clipboard or insert fragment.
    pub fn fragment(&self, id: &str) -> Option<&str> {
        self.node(id).map(|node| node.loc.slice(&self.source))
    }

    /// Whether `set-text` would accept this node.
    pub fn supports_text(&self, id: &str) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if node.is_text {
            return true;
        }
        let shape = classify(&node.tag_name, !node.children.is_empty(), node.self_closing);
        if node.self_closing || shape.is_void() || node.is_fragment() {
            return false;
        }
        match node.children.as_slice() {
            [] => node
                .children_loc
                .is_some_and(|region| region.slice(&self.source).trim().is_empty()),
            [only] => only.is_text,
            _ => false,
        }
    }

    /// Ids from the root down to (excluding) `id`.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        self.root().map(|root| root.ancestors_of(id)).unwrap_or_default()
    }

    /// Element ids in document order, text nodes excluded.
    pub fn ids_in_order(&self) -> Vec<String> {
        let mut ids = Vec::new();
        if let Some(root) = self.root() {
            root.walk(&mut |node: &Node| {
                if !node.is_text {
                    ids.push(node.id.clone());
                }
            });
        }
        ids
    }

    /// Every id of the current parse, text nodes included.
    pub fn all_ids(&self) -> Vec<String> {
        self.root().map(Node::ids).unwrap_or_default()
    }
}
