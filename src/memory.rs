//! In-memory persistor implementation.
//!
//! This backend is NOT durable - data is lost on process exit. It is the
//! default when no persistor is injected, and doubles as a test backend:
//! clones share one underlying map, so a test can hold a handle to the
//! same storage a facade writes through.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::persistor::Persistor;

/// In-memory implementation of [`Persistor`].
///
/// Uses a BTreeMap for deterministic iteration and RwLock for concurrency.
#[derive(Clone)]
pub struct MemoryPersistor {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryPersistor {
    /// Create a new empty in-memory persistor.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Get the number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the persistor holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Remove all stored keys.
    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// List stored keys matching a prefix, in lexicographic order.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        self.data
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl Default for MemoryPersistor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistor for MemoryPersistor {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }
}
