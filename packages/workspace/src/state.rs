use crate::config::EditorConfig;
use crate::errors::SyncError;
use crate::source_store::SourceStore;
use crate::sync::DocumentSync;
use sculpt_editor::EditSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Open documents sharing one store and one configuration.
pub struct Workspace {
    store: Arc<dyn SourceStore>,
    config: EditorConfig,
    documents: RwLock<HashMap<String, DocumentSync>>,
}

impl Workspace {
    pub fn new(store: Arc<dyn SourceStore>, config: EditorConfig) -> Self {
        Self {
            store,
            config,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SourceStore> {
        Arc::clone(&self.store)
    }

    /// Open a document, or return the handle already open for it. New
    /// documents start polling at the configured interval.
    pub async fn open(&self, document_id: &str) -> Result<DocumentSync, SyncError> {
        if let Some(sync) = self.documents.read().await.get(document_id) {
            return Ok(sync.clone());
        }

        let mut documents = self.documents.write().await;
        // Another caller may have opened it while we waited for the lock
        if let Some(sync) = documents.get(document_id) {
            return Ok(sync.clone());
        }
        let sync =
            DocumentSync::open(document_id, Arc::clone(&self.store), self.config.engine()).await?;
        sync.start_polling(self.config.poll_interval());
        documents.insert(document_id.to_string(), sync.clone());
        Ok(sync)
    }

    /// A fresh edit session over the current source of an open document.
    pub fn session(&self, sync: &DocumentSync) -> EditSession {
        self.config.session(sync.source())
    }

    pub async fn get(&self, document_id: &str) -> Option<DocumentSync> {
        self.documents.read().await.get(document_id).cloned()
    }

    pub async fn close(&self, document_id: &str) -> bool {
        match self.documents.write().await.remove(document_id) {
            Some(sync) => {
                sync.close();
                true
            }
            None => false,
        }
    }

    pub async fn close_all(&self) {
        let documents: Vec<_> = self.documents.write().await.drain().collect();
        for (_, sync) in &documents {
            sync.close();
        }
        info!(count = documents.len(), "closed all documents");
    }

    pub async fn document_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.documents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_store::MemorySourceStore;

    fn workspace() -> Workspace {
        let store = MemorySourceStore::new();
        store.insert("a.tsx", "export default () => <div />;");
        store.insert("b.tsx", "export default () => <span />;");
        Workspace::new(Arc::new(store), EditorConfig::default())
    }

    #[tokio::test]
    async fn test_open_reuses_handle() {
        let workspace = workspace();
        let first = workspace.open("a.tsx").await.unwrap();
        let second = workspace.open("a.tsx").await.unwrap();
        assert_eq!(first.document_id(), second.document_id());

        workspace.open("b.tsx").await.unwrap();
        assert_eq!(workspace.document_ids().await, vec!["a.tsx", "b.tsx"]);
    }

    #[tokio::test]
    async fn test_open_missing_document() {
        let workspace = workspace();
        assert!(matches!(
            workspace.open("missing.tsx").await,
            Err(SyncError::NotFound(_))
        ));
        assert!(workspace.document_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_follows_document_and_config() {
        let store = MemorySourceStore::new();
        store.insert("a.tsx", "export default () => <div />;");
        let config = EditorConfig {
            history_limit: 7,
            ..EditorConfig::default()
        };
        let workspace = Workspace::new(Arc::new(store), config);

        let sync = workspace.open("a.tsx").await.unwrap();
        let session = workspace.session(&sync);
        assert_eq!(session.document().source(), sync.source());
        assert_eq!(session.ui().state().history.limit(), 7);
        workspace.close_all().await;
    }

    #[tokio::test]
    async fn test_close() {
        let workspace = workspace();
        let sync = workspace.open("a.tsx").await.unwrap();
        assert!(workspace.close("a.tsx").await);
        assert!(sync.is_closed());
        assert!(!workspace.close("a.tsx").await);

        let b = workspace.open("b.tsx").await.unwrap();
        workspace.close_all().await;
        assert!(b.is_closed());
        assert!(workspace.get("b.tsx").await.is_none());
    }
}
