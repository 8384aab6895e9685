//! # Sculpt Editor
//!
//! Structural editing on top of hand-written component source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: source → Node tree (offsets + ids)  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor                                      │
//! │  - correlator: rendered tree ↔ node ids     │
//! │  - interaction: selection, clipboard, undo  │
//! │  - session: keys and clicks → intents       │
//! │  - engine: intents → minimal source edits   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: persistence, polling, preview    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Source is the truth**: the node tree is re-derived after every edit
//! 2. **Surgical edits**: bytes outside the edited span never change
//! 3. **Fail closed**: a mutation that cannot be applied cleanly changes nothing
//! 4. **Ids are per parse**: callers re-resolve ids after every change
//!
//! ## Usage
//!
//! ```rust
//! use sculpt_editor::{apply, Mutation};
//!
//! let source = "export default () => <div><h1>Title</h1><p>Body</p></div>;";
//! let outcome = apply(source, &Mutation::Delete { node_id: "h1-0.0".to_string() }).unwrap();
//! assert_eq!(outcome.source, "export default () => <div><p>Body</p></div>;");
//! ```

pub mod correlator;
mod document;
mod engine;
mod errors;
pub mod history;
pub mod interaction;
pub mod keymap;
pub mod layout;
mod mutations;
pub mod outline;
mod session;
pub mod store;
pub mod text_edit;

pub use correlator::{correlate, linear_order, CorrelationReport, UnmatchedSubtree, VisualNode};
pub use document::Document;
pub use engine::{apply, MutationEngine, DEFAULT_INDENT_UNIT};
pub use errors::{ErrorKind, MutationError};
pub use history::{History, HistoryEntry, DEFAULT_HISTORY_LIMIT};
pub use interaction::{Clipboard, ClipboardOp, EditorUiState, Selection, UiAction, UiEffect};
pub use keymap::{Key, KeyCommand, KeyPress, Modifiers};
pub use mutations::{Mutation, MutationOutcome, Position};
pub use outline::{OutlineAction, OutlineState};
pub use session::{EditSession, Intent};
pub use store::{Dispatch, Reducer, Store, SubscriptionId};
pub use text_edit::{apply_edits, TextEdit};

// Re-export parser types callers need alongside mutations
pub use sculpt_parser::{parse, Node, ParseResult, PropValue};
