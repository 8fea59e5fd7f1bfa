//! # Visit Store
//! The key-value seam under the ledger: bucket keys mapping to sets of domains.
//!
//! The ledger only needs four operations from its backing store, so any
//! set-capable key-value service fits behind [`VisitStore`]. Two backends ship
//! with the crate: [`MemoryStore`] and the snapshot-persisted [`FileStore`].

pub mod file;
pub mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Failure raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Every key currently stored, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Add `members` to the set under `key`, creating it if absent.
    async fn add_members(&self, key: &str, members: &BTreeSet<String>) -> Result<(), StoreError>;

    /// All members under `key`; empty when the key does not exist.
    async fn read_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Drop every key. Administrative reset, not a per-request operation.
    async fn flush_all(&self) -> Result<(), StoreError>;
}
