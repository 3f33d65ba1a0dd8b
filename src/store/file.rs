//! JSON-file store.
//!
//! Each key maps to `<dir>/<key with ':' replaced by '.'>.json`. Writes go to
//! a uniquely named temporary sibling first and are renamed into place, so
//! readers see either the old or the new value.
//!
//! Locks are advisory OS file locks on `<dir>/<name>.lock`, which makes them
//! hold between separate processes sharing the directory.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{KeyLock, KeyValueStore, check_key};
use crate::error::StoreError;

const EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Store that keeps one JSON document per key on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    /// Root directory of this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", key.replace(':', ".")))
    }

    fn lock_path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{LOCK_EXTENSION}", name.replace(':', ".")))
    }
}

fn replace_file(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn lock_file(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    Ok(file)
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> std::io::Result<T> + Send + 'static,
) -> Result<T, StoreError> {
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(std::io::Error::other)?;
    Ok(result?)
}

fn key_for(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(&format!(".{EXTENSION}"))?;
    let key = stem.replace('.', ":");
    check_key(&key).ok().map(|()| key)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        check_key(key)?;
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        check_key(key)?;
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(&value)?;
        blocking(move || replace_file(&dir, &path, &bytes)).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        check_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(key_for) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn lock(&self, name: &str) -> Result<KeyLock, StoreError> {
        check_key(name)?;
        let path = self.lock_path_for(name);
        let file = blocking(move || lock_file(&path)).await?;
        Ok(KeyLock::new(file))
    }
}
