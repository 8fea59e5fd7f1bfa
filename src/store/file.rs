//! Snapshot-persisted store.
//!
//! Keeps the bucket map in memory and rewrites a JSON snapshot after every
//! mutation (write to `<path>.tmp`, then rename). The snapshot is loaded on open,
//! so buckets survive restarts unless the ledger is flushed at startup.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, VisitStore};

type Buckets = HashMap<String, BTreeSet<String>>;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    buckets: RwLock<Buckets>,
}

impl FileStore {
    /// Open (or create on first write) the snapshot at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let buckets = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Buckets::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Buckets::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), buckets = buckets.len(), "opened visit snapshot");
        Ok(Self {
            path,
            buckets: RwLock::new(buckets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, buckets: &Buckets) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(buckets)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VisitStore for FileStore {
    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn add_members(&self, key: &str, members: &BTreeSet<String>) -> Result<(), StoreError> {
        let mut map = self.buckets.write().await;
        let created = !map.contains_key(key);
        let set = map.entry(key.to_string()).or_default();
        let added: Vec<String> = members
            .iter()
            .filter(|m| set.insert((*m).clone()))
            .cloned()
            .collect();

        if let Err(e) = self.persist(&map).await {
            // Roll back so memory never runs ahead of the snapshot.
            if let Some(set) = map.get_mut(key) {
                for m in &added {
                    set.remove(m);
                }
            }
            if created {
                map.remove(key);
            }
            return Err(e);
        }
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
        let mut map = self.buckets.write().await;
        self.persist(&Buckets::new()).await?;
        map.clear();
        Ok(())
    }
}
