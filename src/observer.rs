//! Change notification for observable stores.
//!
//! Each store keeps an explicit list of registered listeners. `subscribe`
//! hands back a [`Subscription`] token that deregisters the listener;
//! dropping the token without calling [`Subscription::unsubscribe`] leaves
//! the listener registered for the life of the store.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerList<T> = Arc<RwLock<Vec<(u64, Listener<T>)>>>;

/// The listener registry for one store.
pub struct Subscribers<T> {
    listeners: ListenerList<T>,
    next_id: AtomicU64,
}

impl<T: 'static> Subscribers<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener, returning the token that removes it.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));

        let weak: Weak<RwLock<Vec<(u64, Listener<T>)>>> = Arc::downgrade(&self.listeners);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.write().retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Invoke every registered listener with `value`.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still run. The listener list is snapshotted first, so a listener
    /// may subscribe or unsubscribe reentrantly without deadlocking.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                warn!("store listener panicked; remaining listeners still run");
            }
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// True if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Token returned by `subscribe`; consumes itself to deregister.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the listener this token was issued for.
    ///
    /// Safe to call after the owning store is gone.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
