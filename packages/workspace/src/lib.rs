//! Keeps documents in sync with where they are stored and drives their
//! live preview.
//!
//! - [`SourceStore`]: where sources are read and written
//! - [`DocumentSync`]: polling, queued optimistic writes and versioning
//! - [`LivePreview`]: latest-wins rendering and correlation
//! - [`Workspace`]: registry of open documents

pub mod config;
pub mod errors;
pub mod preview;
pub mod source_store;
pub mod state;
pub mod sync;

pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use errors::{ConfigError, SyncError};
pub use preview::{LivePreview, LiveRenderer, PreviewFrame, RenderGate, StructuralRenderer};
pub use source_store::{validate_document_id, FsSourceStore, MemorySourceStore, SourceStore};
pub use state::Workspace;
pub use sync::{DocumentSync, MutateOutcome, PollOutcome, SyncSnapshot};
