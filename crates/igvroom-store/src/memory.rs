//! In-memory store backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use igvroom_protocol::RoomId;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{select_range, ListOptions, Store, StoreError, StoreProvider};

/// A process-local partition.
///
/// Cloning yields another handle to the same partition, which lets tests
/// inspect what a room persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty, unshared partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count())
    }

    async fn list(
        &self,
        options: ListOptions,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(select_range(&*self.entries.lock().await, &options))
    }
}

/// Hands out one [`MemoryStore`] per room, reusing it across reopen.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    partitions: Arc<StdMutex<HashMap<RoomId, MemoryStore>>>,
}

impl MemoryBackend {
    /// Creates a backend with no partitions.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for MemoryBackend {
    type Store = MemoryStore;

    fn open(&self, room_id: &RoomId) -> MemoryStore {
        let mut partitions = self
            .partitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        partitions.entry(room_id.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for key in ["cursor:alice", "cursor:bob", "cursor:carol", "setting:locus"] {
            store.put(key, json!(key)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_get_put_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("setting:locus").await.unwrap(), None);
        store.put("setting:locus", json!("chr1")).await.unwrap();
        assert_eq!(store.get("setting:locus").await.unwrap(), Some(json!("chr1")));
    }

    #[tokio::test]
    async fn test_delete_is_batched_and_counts_hits() {
        let store = seeded().await;
        let removed = store
            .delete(&["cursor:alice".into(), "cursor:nobody".into(), "cursor:bob".into()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix_in_key_order() {
        let store = seeded().await;
        let keys: Vec<String> = store
            .list(ListOptions::prefix("cursor:"))
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["cursor:alice", "cursor:bob", "cursor:carol"]);
    }

    #[tokio::test]
    async fn test_list_reverse_with_limit() {
        let store = seeded().await;
        let keys: Vec<String> = store
            .list(ListOptions::prefix("cursor:").reverse().limit(2))
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["cursor:carol", "cursor:bob"]);
    }

    #[tokio::test]
    async fn test_backend_partitions_are_isolated_and_reused() {
        let backend = MemoryBackend::new();
        let a = RoomId::parse("room-a").unwrap();
        let b = RoomId::parse("room-b").unwrap();

        backend.open(&a).put("setting:locus", json!("chr1")).await.unwrap();

        assert_eq!(
            backend.open(&a).get("setting:locus").await.unwrap(),
            Some(json!("chr1"))
        );
        assert!(backend.open(&b).is_empty().await);
    }
}
