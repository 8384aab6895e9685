//! # Document Synchronization
//!
//! Keeps one document's in-memory source consistent with its store while
//! two writers compete: a periodic poll for external changes, and local
//! mutate/save calls.
//!
//! ## Rules
//!
//! - While a save is in flight `pending` holds the optimistic source and
//!   polling is suppressed. A failed save keeps `pending`, so polling stays
//!   off until a later save succeeds or the document is reloaded.
//! - A poll response that raced a local edit is discarded.
//! - Only a confirmed save or a detected external change moves the
//!   `confirmed` baseline and bumps `version`. No-op mutations do neither.
//! - Writes are queued: a mutation is computed against the current source
//!   before any await, and the next one starts only after it settles.
//! - The store write runs on its own task. Dropping the caller or closing
//!   the document never cancels it; a closed document just ignores the
//!   result. The write queue stays held until the save settles, so a
//!   dropped caller never lets a later save race an earlier one.

use crate::errors::SyncError;
use crate::source_store::SourceStore;
use sculpt_editor::{Mutation, MutationEngine};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{watch, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PollOutcome {
    /// A save is pending; the store was not read.
    Suppressed,
    Unchanged,
    /// The response raced a local edit and was dropped.
    Discarded,
    Changed { version: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateOutcome {
    pub source: String,
    pub version: u64,
    pub noop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub document_id: String,
    pub source: String,
    pub version: u64,
    /// A save is in flight or failed and awaits a retry.
    pub pending: bool,
    /// The last save failed.
    pub unsaved: bool,
    pub last_saved_at: Option<i64>,
}

struct SyncState {
    source: String,
    confirmed: String,
    pending: Option<String>,
    unsaved: bool,
    version: u64,
    /// Bumped whenever `source` changes locally.
    local_edits: u64,
    last_saved_at: Option<i64>,
}

struct Shared {
    document_id: String,
    store: Arc<dyn SourceStore>,
    engine: MutationEngine,
    state: Mutex<SyncState>,
    /// Held from the start of a write until its save settles, including
    /// on the detached save task.
    writes: Arc<tokio::sync::Mutex<()>>,
    version_tx: watch::Sender<u64>,
    closed: AtomicBool,
    poller: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to one open document. Clones share the document.
#[derive(Clone)]
pub struct DocumentSync {
    shared: Arc<Shared>,
}

impl DocumentSync {
    /// Fetch the document and start tracking it at version 0.
    pub async fn open(
        document_id: impl Into<String>,
        store: Arc<dyn SourceStore>,
        engine: MutationEngine,
    ) -> Result<Self, SyncError> {
        let document_id = document_id.into();
        let source = store.get_source(&document_id).await?;
        let (version_tx, _) = watch::channel(0);
        info!(document = %document_id, bytes = source.len(), "document opened");

        Ok(Self {
            shared: Arc::new(Shared {
                document_id,
                store,
                engine,
                state: Mutex::new(SyncState {
                    confirmed: source.clone(),
                    source,
                    pending: None,
                    unsaved: false,
                    version: 0,
                    local_edits: 0,
                    last_saved_at: None,
                }),
                writes: Arc::new(tokio::sync::Mutex::new(())),
                version_tx,
                closed: AtomicBool::new(false),
                poller: Mutex::new(None),
            }),
        })
    }

    pub fn document_id(&self) -> &str {
        &self.shared.document_id
    }

    pub fn source(&self) -> String {
        self.shared.state().source.clone()
    }

    pub fn version(&self) -> u64 {
        self.shared.state().version
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.shared.state();
        SyncSnapshot {
            document_id: self.shared.document_id.clone(),
            source: state.source.clone(),
            version: state.version,
            pending: state.pending.is_some(),
            unsaved: state.unsaved,
            last_saved_at: state.last_saved_at,
        }
    }

    /// Version changes, for re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version_tx.subscribe()
    }

    /// Poll the store on a fixed interval until the document is closed or
    /// every handle is dropped. Replaces any earlier poll loop.
    pub fn start_polling(&self, interval: Duration) {
        let handle = tokio::spawn(poll_loop(Arc::downgrade(&self.shared), interval));
        let previous = self.shared.poller().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub async fn poll_once(&self) -> Result<PollOutcome, SyncError> {
        self.shared.poll_once().await
    }

    #[instrument(skip(self, mutation), fields(document = %self.shared.document_id, kind = mutation.name()))]
    pub async fn mutate(&self, mutation: &Mutation) -> Result<MutateOutcome, SyncError> {
        let queue = self.shared.queue().await;
        self.mutate_queued(mutation, queue).await
    }

    /// Mutate with ids taken from a render of `correlation_version`. Fails
    /// if the document moved on since, or holds unsaved local edits the
    /// render never saw.
    #[instrument(skip(self, mutation), fields(document = %self.shared.document_id, kind = mutation.name()))]
    pub async fn mutate_at(
        &self,
        correlation_version: u64,
        mutation: &Mutation,
    ) -> Result<MutateOutcome, SyncError> {
        let queue = self.shared.queue().await;
        {
            let state = self.shared.state();
            if correlation_version != state.version || state.pending.is_some() {
                return Err(SyncError::StaleCorrelation {
                    requested: correlation_version,
                    current: state.version,
                });
            }
        }
        self.mutate_queued(mutation, queue).await
    }

    /// Save a whole source, e.g. one restored by undo. Identical content
    /// still counts as a confirmed change.
    pub async fn save(&self, source: impl Into<String>) -> Result<u64, SyncError> {
        let source = source.into();
        let queue = self.shared.queue().await;
        {
            let mut state = self.shared.state();
            self.shared.ensure_open()?;
            state.source.clone_from(&source);
            state.pending = Some(source.clone());
            state.local_edits += 1;
        }
        self.shared.persist(source, queue).await
    }

    /// Try the pending save again after a persistence failure.
    pub async fn retry_save(&self) -> Result<u64, SyncError> {
        let queue = self.shared.queue().await;
        let pending = {
            let state = self.shared.state();
            self.shared.ensure_open()?;
            state.pending.clone()
        };
        match pending {
            Some(source) => self.shared.persist(source, queue).await,
            None => Ok(self.version()),
        }
    }

    /// Drop local state and take whatever the store holds.
    pub async fn reload(&self) -> Result<u64, SyncError> {
        let _queue = self.shared.queue().await;
        self.shared.ensure_open()?;
        let remote = self.shared.store.get_source(&self.shared.document_id).await?;

        let version = {
            let mut state = self.shared.state();
            self.shared.ensure_open()?;
            state.source.clone_from(&remote);
            state.confirmed = remote;
            state.pending = None;
            state.unsaved = false;
            state.local_edits += 1;
            state.version += 1;
            state.version
        };
        self.shared.version_tx.send_replace(version);
        info!(document = %self.shared.document_id, version, "document reloaded");
        Ok(version)
    }

    /// Stop polling and ignore the outcome of in-flight saves. The saves
    /// themselves still complete.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let poller = self.shared.poller().take();
        if let Some(poller) = poller {
            poller.abort();
        }
        // Wake subscribers so they notice the close
        self.shared.version_tx.send_modify(|_| {});
        info!(document = %self.shared.document_id, "document closed");
    }

    async fn mutate_queued(
        &self,
        mutation: &Mutation,
        queue: OwnedMutexGuard<()>,
    ) -> Result<MutateOutcome, SyncError> {
        let source = {
            let mut state = self.shared.state();
            self.shared.ensure_open()?;
            let outcome = self.shared.engine.apply(&state.source, mutation)?;
            if outcome.noop {
                debug!(version = state.version, "no-op mutation");
                return Ok(MutateOutcome {
                    source: outcome.source,
                    version: state.version,
                    noop: true,
                });
            }
            state.source.clone_from(&outcome.source);
            state.pending = Some(outcome.source.clone());
            state.local_edits += 1;
            outcome.source
        };

        let version = self.shared.persist(source.clone(), queue).await?;
        Ok(MutateOutcome {
            source,
            version,
            noop: false,
        })
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn queue(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.writes).lock_owned().await
    }

    fn ensure_open(&self) -> Result<(), SyncError> {
        if self.closed.load(Ordering::Acquire) {
            Err(SyncError::Closed)
        } else {
            Ok(())
        }
    }

    async fn poll_once(&self) -> Result<PollOutcome, SyncError> {
        let edits = {
            let state = self.state();
            self.ensure_open()?;
            if state.pending.is_some() {
                return Ok(PollOutcome::Suppressed);
            }
            state.local_edits
        };

        let remote = self.store.get_source(&self.document_id).await?;

        let version = {
            let mut state = self.state();
            self.ensure_open()?;
            if state.pending.is_some() || state.local_edits != edits {
                debug!(document = %self.document_id, "poll raced a local edit");
                return Ok(PollOutcome::Discarded);
            }
            if remote == state.confirmed {
                return Ok(PollOutcome::Unchanged);
            }
            state.source.clone_from(&remote);
            state.confirmed = remote;
            state.unsaved = false;
            state.version += 1;
            state.version
        };
        self.version_tx.send_replace(version);
        info!(document = %self.document_id, version, "external change picked up");
        Ok(PollOutcome::Changed { version })
    }

    /// Write `source` on a detached task and fold the result into state.
    /// The task owns the write queue guard, so the next write cannot start
    /// before this one settles even if the caller is dropped.
    async fn persist(
        self: &Arc<Self>,
        source: String,
        queue: OwnedMutexGuard<()>,
    ) -> Result<u64, SyncError> {
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = shared.store.put_source(&shared.document_id, &source).await;
            let settled = shared.settle(source, result);
            drop(queue);
            settled
        });
        task.await
            .map_err(|err| SyncError::Persistence(format!("save task failed: {}", err)))?
    }

    fn settle(&self, source: String, result: Result<(), SyncError>) -> Result<u64, SyncError> {
        let mut state = self.state();
        if self.closed.load(Ordering::Acquire) {
            debug!(document = %self.document_id, ok = result.is_ok(), "save settled after close");
            return Err(SyncError::Closed);
        }

        match result {
            Ok(()) => {
                if state.pending.as_deref() == Some(source.as_str()) {
                    state.pending = None;
                }
                state.confirmed = source;
                state.unsaved = false;
                state.version += 1;
                state.last_saved_at = Some(chrono::Utc::now().timestamp_millis());
                let version = state.version;
                drop(state);

                self.version_tx.send_replace(version);
                debug!(document = %self.document_id, version, "save confirmed");
                Ok(version)
            }
            Err(err) => {
                state.unsaved = true;
                warn!(document = %self.document_id, error = %err, "save failed, keeping local changes");
                Err(match err {
                    SyncError::Persistence(message) => SyncError::Persistence(message),
                    other => SyncError::Persistence(other.to_string()),
                })
            }
        }
    }
}

async fn poll_loop(shared: Weak<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if shared.closed.load(Ordering::Acquire) {
            break;
        }
        match shared.poll_once().await {
            Ok(PollOutcome::Changed { version }) => debug!(version, "poll changed document"),
            Ok(_) => {}
            Err(err) => warn!(document = %shared.document_id, error = %err, "poll failed"),
        }
    }
}
