//! # sovran-storage
//!
//! Reactive, persisted state slots for an analytics client.
//!
//! One [`SovranStorage`] instance owns the client's durable state as four
//! independently observable slots:
//!
//! - **`context`**: app/device metadata, updates deep-merged
//! - **`settings`**: per-plugin configuration, updates merged at the top level
//! - **`pending_events`**: ordered queue of events awaiting delivery
//! - **`is_ready`**: flips true once persisted state has been rehydrated
//!
//! Reads are synchronous snapshots; updates apply in memory and notify
//! listeners before the write-back to the injected [`Persistor`] backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sovran_storage::{SovranStorage, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> sovran_storage::Result<()> {
//!     let storage = SovranStorage::new(StorageConfig::new("my-app"))?;
//!     storage.ready().await;
//!
//!     let context = storage
//!         .context
//!         .set(json!({ "app": { "name": "my-app", "version": "1.0.0" } }))
//!         .await?;
//!     println!("context: {context}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Listening for changes
//!
//! ```rust,no_run
//! use serde_json::json;
//! use sovran_storage::{SovranStorage, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> sovran_storage::Result<()> {
//!     let storage = SovranStorage::new(StorageConfig::new("my-app"))?;
//!
//!     let subscription = storage.context.on_change(|context| {
//!         println!("context changed: {context}");
//!     });
//!
//!     storage.context.set(json!({ "device": { "token": "123" } })).await?;
//!     subscription.unsubscribe();
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Durable backend
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sovran_storage::{SovranStorage, SqlitePersistor, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> sovran_storage::Result<()> {
//!     let persistor = Arc::new(SqlitePersistor::open("analytics.db").await?);
//!     let storage = SovranStorage::new(
//!         StorageConfig::new("my-app").with_persistor(persistor),
//!     )?;
//!     storage.ready().await;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod merge;
pub mod observer;
pub mod persistor;
pub mod sqlite;
pub mod storage;
pub mod store;
pub mod types;

// Re-export main types
pub use error::{Result, StoreError};
pub use memory::MemoryPersistor;
pub use merge::{deep_merge, shallow_merge};
pub use observer::{Subscribers, Subscription};
pub use persistor::{slot_key, Persistor, PersistorExt, MAX_STORE_ID_LENGTH};
pub use sqlite::SqlitePersistor;
pub use storage::{
    ContextStore, PendingEventsStore, ReadinessStore, SettingsStore, SovranStorage, StorageConfig,
};
pub use store::Store;
pub use types::{Context, EventType, SegmentEvent, Settings};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::memory::MemoryPersistor;
    pub use crate::persistor::{Persistor, PersistorExt};
    pub use crate::sqlite::SqlitePersistor;
    pub use crate::storage::{SovranStorage, StorageConfig};
    pub use crate::types::{Context, EventType, SegmentEvent, Settings};
}
