//! Persistor trait - the durability contract backing every store slot.
//!
//! A persistor is an async key-value backend over opaque byte blobs. It is
//! injected into the storage facade and shared by all of its slots; the
//! facade namespaces keys per instance so several instances can share one
//! physical backend.
//!
//! Implementations must provide read-after-write consistency per key: a
//! `get` issued after a completed `set` for the same key observes the
//! value that was written. Both shipped backends ([`MemoryPersistor`],
//! [`SqlitePersistor`]) satisfy this.
//!
//! [`MemoryPersistor`]: crate::memory::MemoryPersistor
//! [`SqlitePersistor`]: crate::sqlite::SqlitePersistor

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StoreError};

/// Maximum store id length in bytes.
pub const MAX_STORE_ID_LENGTH: usize = 128;

/// Validate a store id before it is used to namespace persisted keys.
pub fn validate_store_id(store_id: &str) -> Result<()> {
    if store_id.trim().is_empty() {
        return Err(StoreError::InvalidConfig(
            "storeId must not be empty".to_string(),
        ));
    }
    if store_id.len() > MAX_STORE_ID_LENGTH {
        return Err(StoreError::InvalidConfig(format!(
            "storeId exceeds maximum length of {} bytes",
            MAX_STORE_ID_LENGTH
        )));
    }
    Ok(())
}

/// Build the persisted key for one slot of one storage instance.
///
/// The scheme is `"{store_id}-{slot}"`, stable across releases so
/// previously persisted state keeps hydrating.
pub fn slot_key(store_id: &str, slot: &str) -> String {
    format!("{}-{}", store_id, slot)
}

/// Async key-value durability backend.
///
/// Storage slots move JSON-encoded bytes through this trait; the
/// [`PersistorExt`] helpers do the encoding. Backends never interpret the
/// blobs they hold. Kept to two methods so it stays object safe - the
/// facade holds an `Arc<dyn Persistor>`.
#[async_trait]
pub trait Persistor: Send + Sync {
    /// Load the blob stored under `key`.
    ///
    /// Returns `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// JSON encode/decode helpers available on every [`Persistor`].
#[async_trait]
pub trait PersistorExt: Persistor {
    /// Load and JSON-decode the value stored under `key`.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => {
                let value: T = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// JSON-encode `value` and store it under `key`.
    async fn set_json<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes).await
    }
}

impl<P: Persistor + ?Sized> PersistorExt for P {}
