//! Key-value persistence
//!
//! The services (`ContentStore`, `UserStore`, `ScoreLedger`) keep their state
//! in a [`KeyValueStore`]: opaque string keys mapped to JSON values with
//! read-after-write consistency. Read-modify-write sequences take a
//! [`KeyLock`] first; the file backend's locks hold across processes that
//! share a data directory.
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`FileStore`], one JSON file per key under a data directory
//!
//! Key layout used by the services:
//!
//! | Key               | Value                     |
//! |-------------------|---------------------------|
//! | `labs`            | lab catalog (array)       |
//! | `user:<id>`       | one user record           |
//! | `session:current` | logged-in session         |

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;

/// Exclusive hold on a lock name, released on drop.
pub struct KeyLock {
    _held: Box<dyn std::any::Any + Send + Sync>,
}

impl KeyLock {
    pub(crate) fn new(held: impl std::any::Any + Send + Sync) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for KeyLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLock").finish_non_exhaustive()
    }
}

/// Abstract durable key-value mapping.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Reads the value stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes `key`. Returns `true` if it existed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Lists keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Waits for exclusive ownership of the lock named `name`.
    ///
    /// Lock names follow the key rules but live in their own namespace;
    /// locking `user:1` does not block reads or writes of `user:1`.
    async fn lock(&self, name: &str) -> Result<KeyLock, StoreError>;
}

/// Reads and deserializes the value under `key`.
///
/// # Errors
///
/// Returns `StoreError` if the backend fails or the value has the wrong shape.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.read(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serializes `value` and stores it under `key`.
///
/// # Errors
///
/// Returns `StoreError` if serialization or the backend fails.
pub async fn write_json<T: Serialize + Sync + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.write(key, serde_json::to_value(value)?).await
}

/// Rejects keys the file backend cannot map to a file name.
///
/// Allowed: ASCII alphanumerics, `-`, `_`, and `:` as a namespace separator.
pub(crate) fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        score: u64,
    }

    #[tokio::test]
    async fn json_helpers_round_trip_through_any_backend() {
        let store = MemoryStore::new();
        let record = Record {
            name: "neo".into(),
            score: 300,
        };
        write_json(&store, "user:1", &record).await.unwrap();
        let back: Option<Record> = read_json(&store, "user:1").await.unwrap();
        assert_eq!(back, Some(record));

        let missing: Option<Record> = read_json(&store, "user:2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn wrong_shape_is_a_serialization_error() {
        let store = MemoryStore::new();
        store.write("user:1", serde_json::json!([1, 2])).await.unwrap();
        let err = read_json::<Record>(&store, "user:1").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn key_rules() {
        assert!(check_key("user:12").is_ok());
        assert!(check_key("session:current").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("a b").is_err());
    }
}
