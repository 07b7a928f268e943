//! Store - a single named, observable, persisted state container.
//!
//! A store holds one value in memory, notifies listeners on every update,
//! and writes each new value through its persistor. How an update combines
//! with the current value is the caller's choice: [`Store::update`] takes
//! the combining function, and the facade supplies the slot's merge policy
//! (see [`merge`](crate::merge)).
//!
//! Update semantics, in order:
//! 1. the new value is computed and installed under the in-memory lock,
//! 2. listeners run synchronously with the new value,
//! 3. the value is written to the persistor behind a per-store gate.
//!
//! A failed write leaves the in-memory value in place; durability is
//! best-effort, the live view is authoritative. Writes go through a FIFO
//! gate so the backend always ends up holding the latest update.

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::observer::{Subscribers, Subscription};
use crate::persistor::{Persistor, PersistorExt};

/// A named state container with change notification and write-through
/// persistence.
pub struct Store<T> {
    key: String,
    value: RwLock<T>,
    touched: AtomicBool,
    subscribers: Subscribers<T>,
    persistor: Option<Arc<dyn Persistor>>,
    write_gate: Mutex<()>,
}

impl<T> Store<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a store persisted under `key`, starting at `default` until
    /// [`hydrate`](Store::hydrate) or the first update.
    pub fn new(key: impl Into<String>, default: T, persistor: Arc<dyn Persistor>) -> Self {
        Self {
            key: key.into(),
            value: RwLock::new(default),
            touched: AtomicBool::new(false),
            subscribers: Subscribers::new(),
            persistor: Some(persistor),
            write_gate: Mutex::new(()),
        }
    }

    /// Create a store that lives in memory only.
    ///
    /// Updates skip the write-back and [`hydrate`](Store::hydrate) is a
    /// no-op. Used for the readiness slot, which must start false on every
    /// launch.
    pub fn ephemeral(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            value: RwLock::new(default),
            touched: AtomicBool::new(false),
            subscribers: Subscribers::new(),
            persistor: None,
            write_gate: Mutex::new(()),
        }
    }

    /// The key this store persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot of the current value.
    ///
    /// Never blocks on I/O. Before hydration completes this is the
    /// default; afterwards it is the hydrated or last-updated value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Apply `apply` to the current value and install the result.
    ///
    /// Listeners observe the new value before this returns, and a
    /// subsequent [`get`](Store::get) reflects it even if the write-back
    /// is still in flight or fails. Resolves with the new value once the
    /// write-back completes.
    pub async fn update<F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let mut value = self.value.write();
            let next = apply(&*value);
            *value = next.clone();
            // Marked under the lock so a concurrent hydrate cannot clobber
            // this update.
            self.touched.store(true, Ordering::SeqCst);
            next
        };

        self.subscribers.notify(&new_value);

        if let Some(persistor) = &self.persistor {
            let _gate = self.write_gate.lock().await;
            persistor.set_json(&self.key, &new_value).await?;
        }

        Ok(new_value)
    }

    /// Register a listener invoked with the new value on every update.
    pub fn on_change(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.subscribers.subscribe(listener)
    }

    /// Load the persisted value into memory.
    ///
    /// Absent key: the default stays. Backend or decode failure: the
    /// default stays and a warning is logged; hydration still counts as
    /// complete so readiness is never blocked by a broken backend. A value
    /// that was already updated this session is never overwritten.
    pub async fn hydrate(&self) {
        let Some(persistor) = &self.persistor else {
            return;
        };

        match persistor.get_json::<T>(&self.key).await {
            Ok(Some(loaded)) => {
                let mut value = self.value.write();
                if !self.touched.load(Ordering::SeqCst) {
                    *value = loaded;
                    debug!(key = %self.key, "hydrated persisted value");
                }
            }
            Ok(None) => {
                debug!(key = %self.key, "no persisted value, keeping default");
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "hydration failed, keeping default");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryPersistor;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;

    /// A backend that fails every operation.
    struct BrokenPersistor;

    #[async_trait]
    impl Persistor for BrokenPersistor {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(StoreError::Persistence("backend down".to_string()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(StoreError::Persistence("backend down".to_string()))
        }
    }

    fn value_store(persistor: Arc<dyn Persistor>) -> Store<Value> {
        Store::new("test-context", json!({}), persistor)
    }

    #[tokio::test]
    async fn test_get_returns_default_before_update() {
        let store = value_store(Arc::new(MemoryPersistor::new()));
        assert_eq!(store.get(), json!({}));
    }

    #[tokio::test]
    async fn test_update_installs_and_returns_new_value() {
        let store = value_store(Arc::new(MemoryPersistor::new()));

        let updated = store.update(|_| json!({ "a": 1 })).await.unwrap();
        assert_eq!(updated, json!({ "a": 1 }));
        assert_eq!(store.get(), json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn test_update_persists_under_store_key() {
        let persistor = MemoryPersistor::new();
        let store = value_store(Arc::new(persistor.clone()));

        store.update(|_| json!({ "a": 1 })).await.unwrap();

        let persisted: Value = persistor.get_json("test-context").await.unwrap().unwrap();
        assert_eq!(persisted, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn test_listener_called_once_per_update() {
        let store = value_store(Arc::new(MemoryPersistor::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let _sub = store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.update(|_| json!({ "a": 1 })).await.unwrap();
        store.update(|_| json!({ "a": 2 })).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_listener_sees_new_value() {
        let store = value_store(Arc::new(MemoryPersistor::new()));
        let seen: Arc<RwLock<Option<Value>>> = Arc::new(RwLock::new(None));

        let sink = Arc::clone(&seen);
        let _sub = store.on_change(move |value: &Value| {
            *sink.write() = Some(value.clone());
        });

        store.update(|_| json!({ "a": 1 })).await.unwrap();
        assert_eq!(*seen.read(), Some(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_notifications() {
        let store = value_store(Arc::new(MemoryPersistor::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let sub = store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.update(|_| json!({ "a": 1 })).await.unwrap();
        sub.unsubscribe();
        store.update(|_| json!({ "a": 2 })).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_notifies() {
        let store = value_store(Arc::new(BrokenPersistor));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let _sub = store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = store.update(|_| json!({ "a": 1 })).await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));

        // The live view was updated and listeners ran before the write
        // failed; no rollback.
        assert_eq!(store.get(), json!({ "a": 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hydrate_applies_persisted_value() {
        let persistor = MemoryPersistor::new();
        persistor
            .set_json("test-context", &json!({ "restored": true }))
            .await
            .unwrap();

        let store = value_store(Arc::new(persistor));
        assert_eq!(store.get(), json!({}));

        store.hydrate().await;
        assert_eq!(store.get(), json!({ "restored": true }));
    }

    #[tokio::test]
    async fn test_hydrate_absent_key_keeps_default() {
        let store = value_store(Arc::new(MemoryPersistor::new()));
        store.hydrate().await;
        assert_eq!(store.get(), json!({}));
    }

    #[tokio::test]
    async fn test_hydrate_failure_keeps_default() {
        let store = value_store(Arc::new(BrokenPersistor));
        store.hydrate().await;
        assert_eq!(store.get(), json!({}));
    }

    #[tokio::test]
    async fn test_hydrate_never_overwrites_an_update() {
        let persistor = MemoryPersistor::new();
        persistor
            .set_json("test-context", &json!({ "stale": true }))
            .await
            .unwrap();

        let store = value_store(Arc::new(persistor));
        store.update(|_| json!({ "fresh": true })).await.unwrap();

        store.hydrate().await;
        assert_eq!(store.get(), json!({ "fresh": true }));
    }

    #[tokio::test]
    async fn test_ephemeral_store_skips_persistence() {
        let store: Store<bool> = Store::ephemeral("test-isReady", false);

        let updated = store.update(|_| true).await.unwrap();
        assert!(updated);
        assert!(store.get());

        // Nothing to hydrate from, nothing persisted.
        store.hydrate().await;
        assert!(store.get());
    }

    #[tokio::test]
    async fn test_sequential_updates_leave_latest_persisted() {
        let persistor = MemoryPersistor::new();
        let store = value_store(Arc::new(persistor.clone()));

        for n in 1..=3 {
            store.update(move |_| json!({ "n": n })).await.unwrap();
        }

        assert_eq!(store.get(), json!({ "n": 3 }));
        let persisted: Value = persistor.get_json("test-context").await.unwrap().unwrap();
        assert_eq!(persisted, json!({ "n": 3 }));
    }
}
