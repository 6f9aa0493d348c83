//! Persisted variation stamps, keyed by (index alias, content key)

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::model::ChangeStamp;

/// Storage for the variation stamp written alongside each indexed document
#[async_trait]
pub trait StampStore: Send + Sync {
    async fn get(&self, alias: &str, key: &Uuid) -> Result<Option<ChangeStamp>>;

    async fn put(&self, alias: &str, key: &Uuid, stamp: &ChangeStamp) -> Result<()>;

    async fn remove(&self, alias: &str, key: &Uuid) -> Result<()>;

    /// Drop every stamp for an alias (full rebuilds)
    async fn clear(&self, alias: &str) -> Result<()>;
}

/// Volatile stamp store for tests; every stamp miss forces a cascade, which
/// is safe but slow for real hosts
#[derive(Default)]
pub struct InMemoryStampStore {
    stamps: DashMap<(String, Uuid), ChangeStamp>,
}

impl InMemoryStampStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StampStore for InMemoryStampStore {
    async fn get(&self, alias: &str, key: &Uuid) -> Result<Option<ChangeStamp>> {
        Ok(self
            .stamps
            .get(&(alias.to_string(), *key))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, alias: &str, key: &Uuid, stamp: &ChangeStamp) -> Result<()> {
        self.stamps
            .insert((alias.to_string(), *key), stamp.clone());
        Ok(())
    }

    async fn remove(&self, alias: &str, key: &Uuid) -> Result<()> {
        self.stamps.remove(&(alias.to_string(), *key));
        Ok(())
    }

    async fn clear(&self, alias: &str) -> Result<()> {
        self.stamps.retain(|(a, _), _| a != alias);
        Ok(())
    }
}

/// Durable stamp store; one sled tree per alias, uuid bytes as keys
pub struct SledStampStore {
    db: sled::Db,
}

impl SledStampStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn tree(&self, alias: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(alias)?)
    }
}

#[async_trait]
impl StampStore for SledStampStore {
    async fn get(&self, alias: &str, key: &Uuid) -> Result<Option<ChangeStamp>> {
        let tree = self.tree(alias)?;
        Ok(tree
            .get(key.as_bytes())?
            .map(|bytes| ChangeStamp::from_bytes(bytes.to_vec())))
    }

    async fn put(&self, alias: &str, key: &Uuid, stamp: &ChangeStamp) -> Result<()> {
        let tree = self.tree(alias)?;
        tree.insert(key.as_bytes(), stamp.as_bytes())?;
        Ok(())
    }

    async fn remove(&self, alias: &str, key: &Uuid) -> Result<()> {
        let tree = self.tree(alias)?;
        tree.remove(key.as_bytes())?;
        Ok(())
    }

    async fn clear(&self, alias: &str) -> Result<()> {
        let tree = self.tree(alias)?;
        tree.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variation;
    use std::collections::BTreeSet;

    fn stamp() -> ChangeStamp {
        let set: BTreeSet<Variation> = std::iter::once(Variation::culture("en-us")).collect();
        ChangeStamp::from_variations(&set).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryStampStore::new();
        let key = Uuid::new_v4();

        assert!(store.get("content", &key).await.unwrap().is_none());
        store.put("content", &key, &stamp()).await.unwrap();
        assert_eq!(store.get("content", &key).await.unwrap(), Some(stamp()));

        store.remove("content", &key).await.unwrap();
        assert!(store.get("content", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_scoped_to_the_alias() {
        let store = InMemoryStampStore::new();
        let key = Uuid::new_v4();
        store.put("content", &key, &stamp()).await.unwrap();
        store.put("media", &key, &stamp()).await.unwrap();

        store.clear("content").await.unwrap();
        assert!(store.get("content", &key).await.unwrap().is_none());
        assert!(store.get("media", &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sled_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let key = Uuid::new_v4();

        {
            let store = SledStampStore::open(dir.path()).unwrap();
            store.put("content", &key, &stamp()).await.unwrap();
        }

        let store = SledStampStore::open(dir.path()).unwrap();
        assert_eq!(store.get("content", &key).await.unwrap(), Some(stamp()));
    }
}
