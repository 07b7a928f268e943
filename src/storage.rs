//! SovranStorage - the registry owning the four state slots of one
//! analytics client instance.
//!
//! Construction takes a [`StorageConfig`] carrying the instance's store id
//! (namespacing every persisted key) and optionally the persistor to write
//! through. The four slots are public fields, each independently readable
//! and subscribable:
//!
//! - `is_ready` - flips true once hydration finishes, never reverts
//! - `context` - app/device metadata, updates deep-merged
//! - `settings` - plugin configuration, updates merged at the top level
//! - `pending_events` - ordered event queue with append/remove
//!
//! Hydration runs in a background task spawned at construction, so the
//! facade must be created inside a Tokio runtime. Until hydration
//! completes every slot serves its default.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::Result;
use crate::memory::MemoryPersistor;
use crate::merge::{deep_merge, shallow_merge};
use crate::observer::Subscription;
use crate::persistor::{slot_key, validate_store_id, Persistor};
use crate::store::Store;
use crate::types::{Context, SegmentEvent, Settings};

const CONTEXT_SLOT: &str = "context";
const SETTINGS_SLOT: &str = "settings";
const PENDING_EVENTS_SLOT: &str = "pendingEvents";
const IS_READY_SLOT: &str = "isReady";

/// Configuration for a [`SovranStorage`] instance.
pub struct StorageConfig {
    store_id: String,
    persistor: Option<Arc<dyn Persistor>>,
}

impl StorageConfig {
    /// Configuration with the given store id and the built-in in-memory
    /// backend.
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            persistor: None,
        }
    }

    /// Write through the given persistor instead of the built-in backend.
    pub fn with_persistor(mut self, persistor: Arc<dyn Persistor>) -> Self {
        self.persistor = Some(persistor);
        self
    }
}

/// Readiness slot: observable, not externally settable.
#[derive(Clone)]
pub struct ReadinessStore {
    inner: Arc<Store<bool>>,
}

impl ReadinessStore {
    /// True once every persisted slot has hydrated.
    pub fn get(&self) -> bool {
        self.inner.get()
    }

    /// Listen for the readiness flip.
    pub fn on_change(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.inner.on_change(listener)
    }
}

/// Context slot: deeply-nested metadata, updates deep-merged.
#[derive(Clone)]
pub struct ContextStore {
    inner: Arc<Store<Context>>,
}

impl ContextStore {
    /// Snapshot of the current context.
    pub fn get(&self) -> Context {
        self.inner.get()
    }

    /// Deep-merge `update` into the context.
    ///
    /// Nested values set by other producers survive; only the paths
    /// present in `update` change. Resolves with the merged context.
    pub async fn set(&self, update: Context) -> Result<Context> {
        self.inner
            .update(|current| deep_merge(current, &update))
            .await
    }

    /// Listen for context changes.
    pub fn on_change(&self, listener: impl Fn(&Context) + Send + Sync + 'static) -> Subscription {
        self.inner.on_change(listener)
    }
}

/// Settings slot: per-plugin configuration, updates merged at the top
/// level only.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Store<Settings>>,
}

impl SettingsStore {
    /// Snapshot of the current settings.
    pub fn get(&self) -> Settings {
        self.inner.get()
    }

    /// Overwrite or add the top-level keys present in `update`.
    ///
    /// A plugin's whole entry is replaced; entries not named in `update`
    /// are untouched. Resolves with the merged settings.
    pub async fn set(&self, update: Settings) -> Result<Settings> {
        self.inner
            .update(|current| shallow_merge(current, &update))
            .await
    }

    /// Listen for settings changes.
    pub fn on_change(&self, listener: impl Fn(&Settings) + Send + Sync + 'static) -> Subscription {
        self.inner.on_change(listener)
    }
}

/// Pending-events slot: the ordered queue of events awaiting delivery.
#[derive(Clone)]
pub struct PendingEventsStore {
    inner: Arc<Store<Vec<SegmentEvent>>>,
}

impl PendingEventsStore {
    /// Snapshot of the queue in insertion order.
    ///
    /// Mutating the returned vector does not affect the store.
    pub fn get(&self) -> Vec<SegmentEvent> {
        self.inner.get()
    }

    /// Append `event` to the queue.
    ///
    /// Duplicate message ids are kept; the store does not deduplicate.
    pub async fn add(&self, event: SegmentEvent) -> Result<Vec<SegmentEvent>> {
        self.inner
            .update(move |events| {
                let mut next = events.clone();
                next.push(event);
                next
            })
            .await
    }

    /// Remove the first queued event with `event`'s message id.
    ///
    /// Silent no-op when no event matches.
    pub async fn remove(&self, event: &SegmentEvent) -> Result<Vec<SegmentEvent>> {
        let message_id = event.message_id.clone();
        self.inner
            .update(move |events| {
                let mut next = events.clone();
                if let Some(index) = next.iter().position(|e| e.message_id == message_id) {
                    next.remove(index);
                }
                next
            })
            .await
    }

    /// Listen for queue changes.
    pub fn on_change(
        &self,
        listener: impl Fn(&Vec<SegmentEvent>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.on_change(listener)
    }
}

/// The storage facade for one analytics client instance.
pub struct SovranStorage {
    store_id: String,
    /// Readiness flag, false until hydration completes.
    pub is_ready: ReadinessStore,
    /// App/device metadata.
    pub context: ContextStore,
    /// Per-plugin configuration.
    pub settings: SettingsStore,
    /// Events awaiting delivery.
    pub pending_events: PendingEventsStore,
    ready_notify: Arc<Notify>,
}

impl SovranStorage {
    /// Build the facade and start hydrating its slots in the background.
    ///
    /// Fails fast on an unusable configuration. Must be called inside a
    /// Tokio runtime.
    pub fn new(config: StorageConfig) -> Result<Self> {
        validate_store_id(&config.store_id)?;

        let store_id = config.store_id;
        let persistor: Arc<dyn Persistor> = config
            .persistor
            .unwrap_or_else(|| Arc::new(MemoryPersistor::new()));

        let context = Arc::new(Store::new(
            slot_key(&store_id, CONTEXT_SLOT),
            Value::Object(Map::new()),
            Arc::clone(&persistor),
        ));
        let settings = Arc::new(Store::new(
            slot_key(&store_id, SETTINGS_SLOT),
            Settings::new(),
            Arc::clone(&persistor),
        ));
        let pending_events = Arc::new(Store::new(
            slot_key(&store_id, PENDING_EVENTS_SLOT),
            Vec::new(),
            Arc::clone(&persistor),
        ));
        let is_ready = Arc::new(Store::ephemeral(slot_key(&store_id, IS_READY_SLOT), false));

        let ready_notify = Arc::new(Notify::new());

        {
            let context = Arc::clone(&context);
            let settings = Arc::clone(&settings);
            let pending_events = Arc::clone(&pending_events);
            let is_ready = Arc::clone(&is_ready);
            let ready_notify = Arc::clone(&ready_notify);
            let store_id = store_id.clone();

            tokio::spawn(async move {
                tokio::join!(
                    context.hydrate(),
                    settings.hydrate(),
                    pending_events.hydrate(),
                );
                // Ephemeral flip, cannot fail.
                let _ = is_ready.update(|_| true).await;
                ready_notify.notify_waiters();
                debug!(store_id = %store_id, "storage hydrated and ready");
            });
        }

        Ok(Self {
            store_id,
            is_ready: ReadinessStore { inner: is_ready },
            context: ContextStore { inner: context },
            settings: SettingsStore { inner: settings },
            pending_events: PendingEventsStore {
                inner: pending_events,
            },
            ready_notify,
        })
    }

    /// The id namespacing this instance's persisted keys.
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Wait until hydration has completed and `is_ready` reads true.
    pub async fn ready(&self) {
        loop {
            let notified = self.ready_notify.notified();
            if self.is_ready.get() {
                return;
            }
            notified.await;
        }
    }
}
