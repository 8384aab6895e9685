use sculpt_editor::MutationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The store rejected or failed a write. Local state is kept as unsaved.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),

    /// Node ids came from a render of an older version.
    #[error("Stale correlation: ids from version {requested}, document is at {current}")]
    StaleCorrelation { requested: u64, current: u64 },

    #[error("Document is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
