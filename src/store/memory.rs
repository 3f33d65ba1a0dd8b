//! In-memory store backed by `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{KeyLock, KeyValueStore, check_key};
use crate::error::StoreError;

/// Process-local store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        check_key(key)?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        check_key(key)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        check_key(key)?;
        Ok(self.entries.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn lock(&self, name: &str) -> Result<KeyLock, StoreError> {
        check_key(name)?;
        let mutex = Arc::clone(self.locks.entry(name.to_string()).or_default().value());
        Ok(KeyLock::new(mutex.lock_owned().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn read_after_write() {
        let store = MemoryStore::new();
        assert!(store.read("labs").await.unwrap().is_none());
        store.write("labs", json!([1])).await.unwrap();
        assert_eq!(store.read("labs").await.unwrap(), Some(json!([1])));
        store.write("labs", json!([2])).await.unwrap();
        assert_eq!(store.read("labs").await.unwrap(), Some(json!([2])));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_is_prefix_filtered_and_sorted() {
        let store = MemoryStore::new();
        for key in ["user:3", "user:1", "session:current", "user:2"] {
            store.write(key, json!(null)).await.unwrap();
        }
        assert_eq!(
            store.list("user:").await.unwrap(),
            vec!["user:1", "user:2", "user:3"]
        );
        assert_eq!(store.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = MemoryStore::new();
        store.write("session:current", json!({})).await.unwrap();
        assert!(store.remove("session:current").await.unwrap());
        assert!(!store.remove("session:current").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_dropped() {
        let store = MemoryStore::new();
        let held = store.lock("user:1").await.unwrap();

        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), store.lock("user:1")).await;
        assert!(blocked.is_err());
        // Other names are independent.
        let _other = store.lock("user:2").await.unwrap();

        drop(held);
        let _again = store.lock("user:1").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_keys_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.write("a/b", json!(1)).await,
            Err(StoreError::InvalidKey(_))
        ));
    }
}
