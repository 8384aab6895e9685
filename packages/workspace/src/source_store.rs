//! Where document sources live.
//!
//! Document ids are relative, `/`-separated paths. Stores reject ids that
//! are empty, absolute or step outside the root.

use crate::errors::SyncError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn get_source(&self, document_id: &str) -> Result<String, SyncError>;

    async fn put_source(&self, document_id: &str, source: &str) -> Result<(), SyncError>;
}

/// Check a document id and turn it into a relative path.
pub fn validate_document_id(document_id: &str) -> Result<PathBuf, SyncError> {
    let invalid = || SyncError::InvalidDocumentId(document_id.to_string());
    if document_id.is_empty() || document_id.contains('\0') {
        return Err(invalid());
    }

    let mut path = PathBuf::new();
    for component in Path::new(document_id).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid())
            }
        }
    }
    if path.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(path)
}

/// Sources stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsSourceStore {
    root: PathBuf,
}

impl FsSourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, document_id: &str) -> Result<PathBuf, SyncError> {
        Ok(self.root.join(validate_document_id(document_id)?))
    }
}

#[async_trait]
impl SourceStore for FsSourceStore {
    async fn get_source(&self, document_id: &str) -> Result<String, SyncError> {
        let path = self.resolve(document_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SyncError::NotFound(document_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes go to a sibling temp file first and are renamed into place,
    /// so readers never see a half-written source.
    async fn put_source(&self, document_id: &str, source: &str) -> Result<(), SyncError> {
        let path = self.resolve(document_id)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| SyncError::InvalidDocumentId(document_id.to_string()))?
            .to_string_lossy()
            .into_owned();
        let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let written: std::io::Result<()> = async {
            tokio::fs::write(&temp, source).await?;
            tokio::fs::rename(&temp, &path).await
        }
        .await;

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(SyncError::Persistence(format!("{}: {}", path.display(), err)));
        }
        tracing::debug!(path = %path.display(), bytes = source.len(), "source written");
        Ok(())
    }
}

/// In-memory store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySourceStore {
    sources: Mutex<HashMap<String, String>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(document_id: impl Into<String>, source: impl Into<String>) -> Self {
        let store = Self::new();
        store.insert(document_id, source);
        store
    }

    /// Replace a source directly, as an external editor would.
    pub fn insert(&self, document_id: impl Into<String>, source: impl Into<String>) {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document_id.into(), source.into());
    }

    pub fn get(&self, document_id: &str) -> Option<String> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .cloned()
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn get_source(&self, document_id: &str) -> Result<String, SyncError> {
        validate_document_id(document_id)?;
        self.get(document_id)
            .ok_or_else(|| SyncError::NotFound(document_id.to_string()))
    }

    async fn put_source(&self, document_id: &str, source: &str) -> Result<(), SyncError> {
        validate_document_id(document_id)?;
        self.insert(document_id, source);
        Ok(())
    }
}
