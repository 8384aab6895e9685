//! # Host-Owned Stores
//!
//! UI state the shell shares with the core (selection, clipboard, outline
//! expansion) lives in explicit [`Store`] handles rather than globals. The
//! host creates a store, injects clones of the handle where needed, and
//! subscribes to changes.
//!
//! State changes only through [`Reducer::reduce`], which is pure: side
//! effects come back as values for the caller to run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch<E> {
    pub effects: Vec<E>,
    pub state_changed: bool,
}

impl<E> Dispatch<E> {
    pub fn unchanged() -> Self {
        Self {
            effects: Vec::new(),
            state_changed: false,
        }
    }

    pub fn changed(state_changed: bool) -> Self {
        Self {
            effects: Vec::new(),
            state_changed,
        }
    }

    pub fn with_effect(mut self, effect: E) -> Self {
        self.effects.push(effect);
        self
    }
}

pub trait Reducer {
    type Action;
    type Effect;

    fn reduce(&mut self, action: Self::Action) -> Dispatch<Self::Effect>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Inner<S> {
    state: RwLock<S>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<S>)>>,
    next_id: AtomicU64,
}

/// Shared handle to reducer state. Cloning the handle shares the state.
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Default + Reducer + Clone> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Reducer + Clone> Store<S> {
    pub fn new(state: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Run the reducer and notify listeners if the state changed.
    ///
    /// Listeners receive a snapshot taken after the write lock is released,
    /// so they may dispatch into the same store.
    pub fn dispatch(&self, action: S::Action) -> Vec<S::Effect> {
        let (dispatch, snapshot) = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            let dispatch = state.reduce(action);
            let snapshot = dispatch.state_changed.then(|| state.clone());
            (dispatch, snapshot)
        };

        if let Some(snapshot) = snapshot {
            let listeners: Vec<Listener<S>> = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&snapshot);
            }
        }
        dispatch.effects
    }

    pub fn state(&self) -> S {
        self.read(S::clone)
    }

    /// Borrow the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn subscribe(&self, listener: impl Fn(&S) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Default)]
    struct Counter(i32);

    impl Reducer for Counter {
        type Action = i32;
        type Effect = &'static str;

        fn reduce(&mut self, action: i32) -> Dispatch<&'static str> {
            if action == 0 {
                return Dispatch::unchanged();
            }
            self.0 += action;
            Dispatch::changed(true).with_effect("added")
        }
    }

    #[test]
    fn test_dispatch_notifies_on_change() {
        let store = Store::new(Counter::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |state: &Counter| {
            assert!(state.0 > 0);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(store.dispatch(2), vec!["added"]);
        assert!(store.dispatch(0).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe(id));
        store.dispatch(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().0, 3);
    }

    #[test]
    fn test_clones_share_state() {
        let store = Store::new(Counter::default());
        let handle = store.clone();
        handle.dispatch(5);
        assert_eq!(store.read(|s| s.0), 5);
    }

    #[test]
    fn test_listener_may_dispatch() {
        let store = Store::new(Counter::default());
        let inner = store.clone();
        store.subscribe(move |state: &Counter| {
            if state.0 == 1 {
                inner.dispatch(10);
            }
        });
        store.dispatch(1);
        assert_eq!(store.state().0, 11);
    }
}
