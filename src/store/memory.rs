use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, VisitStore};

/// In-process store. Cloning shares the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitStore for MemoryStore {
    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn add_members(&self, key: &str, members: &BTreeSet<String>) -> Result<(), StoreError> {
        let mut map = self.buckets.write().await;
        map.entry(key.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn read_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.buckets.write().await.clear();
        Ok(())
    }
}
