//! # Sculpt Parser
//!
//! Location-preserving parser for component source files. Finds the
//! exported component, parses the markup it returns, and records exact
//! byte offsets for every node, attribute and child region so the source
//! can later be rewritten surgically.
//!
//! ```text
//! source ──► Scanner (logos) ──► export locator ──► MarkupParser ──► Node tree
//!                                                          │
//!                                                  assign_ids (path + tag)
//! ```

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod literal;
mod markup;
pub mod parser;
pub mod tag_shape;
pub mod tokenizer;

#[cfg(feature = "pretty-errors")]
pub mod pretty;

pub use ast::{Node, ParseResult, Prop, PropValue, SourceLocation, TEXT_TAG};
pub use error::ParseError;
pub use id_generator::generate_id;
pub use parser::{parse, parse_fragment, Parser};
pub use tag_shape::{classify, TagShape};
pub use tokenizer::{tokenize, Lexeme, Token};

#[cfg(feature = "pretty-errors")]
pub use pretty::format_errors;
