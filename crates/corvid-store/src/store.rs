//! File-backed JSON key→value store with atomic whole-file persistence
//!
//! Each store maps 1:1 to one JSON document on disk holding the complete
//! entry mapping. Every save rewrites the whole document to a uniquely named
//! temp file in the same directory and renames it over the canonical path,
//! so the committed file is always a complete snapshot and a crash mid-save
//! never corrupts it. Saves are serialized through a per-store mutex, and
//! the serialization snapshot is taken under that same mutex so a stale
//! snapshot can never overwrite a fresher one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use corvid_types::StoreError;

/// The "database" object. One instance per backing file for the process
/// lifetime; see [`crate::StoreRegistry`].
#[derive(Debug)]
pub struct KeyedStore {
    name: String,
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
    persist_lock: Mutex<()>,
}

impl KeyedStore {
    /// Open a store backed by `<dir>/<name>`. A missing file initializes an
    /// empty store; a file that exists but does not parse is fatal.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(name);
        let entries = match std::fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io { path, source });
            }
        };

        debug!(store = name, entries = entries.len(), "opened store");
        Ok(Self {
            name: name.to_string(),
            path,
            entries: RwLock::new(entries),
            persist_lock: Mutex::new(()),
        })
    }

    /// Store name (the backing file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw read of an entry. Pure in-memory, no I/O.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    /// Typed read of an entry. Returns None when the key is absent; an entry
    /// that exists but does not match `T` is logged and treated as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(store = %self.name, key, "entry does not match expected shape: {}", e);
                None
            }
        }
    }

    /// Typed read defaulting on absence. Never fails.
    pub async fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key).await.unwrap_or_default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Edit an entry, then persist the whole mapping. This is the only path
    /// by which a change becomes durable. On persist failure the in-memory
    /// mutation is retained and the error propagates; callers decide whether
    /// to retry or roll back.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), value);
        }
        self.persist().await
    }

    /// Remove an entry if present, then persist the whole mapping.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write().await;
            entries.remove(key);
        }
        self.persist().await
    }

    /// Serialize the full mapping to a temp file and atomically rename it
    /// over the backing file. Concurrent persists on the same store are
    /// totally ordered by acquisition of the store lock.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;

        // Snapshot under the persist lock, not before it: a snapshot taken
        // earlier could be staler than one already written by another task.
        let snapshot = self.entries.read().await.clone();
        let bytes = serde_json::to_vec(&snapshot).map_err(|source| StoreError::Serialize {
            key: self.name.clone(),
            source,
        })?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name);
        let tmp = self
            .path
            .with_file_name(format!("{}-{}.tmp", file_name, Uuid::new_v4()));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(store = %self.name, entries = snapshot.len(), "persisted store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "settings.json").unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.get_value("anything").await, None);
    }

    #[tokio::test]
    async fn test_get_or_default_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "settings.json").unwrap();
        let ignored: Vec<u64> = store.get_or_default("ignored").await;
        assert!(ignored.is_empty());
    }

    #[tokio::test]
    async fn test_put_then_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "settings.json").unwrap();
        store
            .put("meta", &serde_json::json!({"prefix": "!", "pm_help": true}))
            .await
            .unwrap();
        store.put("ignored", &vec![1u64, 2, 3]).await.unwrap();

        let reloaded = KeyedStore::open(dir.path(), "settings.json").unwrap();
        assert_eq!(reloaded.len().await, 2);
        assert_eq!(
            reloaded.get_value("meta").await,
            Some(serde_json::json!({"prefix": "!", "pm_help": true}))
        );
        let ignored: Vec<u64> = reloaded.get("ignored").await.unwrap();
        assert_eq!(ignored, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "s.json").unwrap();
        store.put("counter", &1u64).await.unwrap();
        store.put("counter", &2u64).await.unwrap();
        assert_eq!(store.get::<u64>("counter").await, Some(2));
    }

    #[tokio::test]
    async fn test_remove_persists_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "s.json").unwrap();
        store.put("temp", &"value").await.unwrap();
        store.remove("temp").await.unwrap();
        store.remove("never-there").await.unwrap();

        let reloaded = KeyedStore::open(dir.path(), "s.json").unwrap();
        assert!(reloaded.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{not json at all").unwrap();
        let err = KeyedStore::open(dir.path(), "bad.json").unwrap_err();
        assert!(
            matches!(err, StoreError::Corrupt { .. }),
            "expected Corrupt, got: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "s.json").unwrap();
        for i in 0..5u64 {
            store.put(&format!("k{}", i), &i).await.unwrap();
        }
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["s.json".to_string()], "stray files: {:?}", names);
    }

    #[tokio::test]
    async fn test_concurrent_puts_all_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(KeyedStore::open(dir.path(), "s.json").unwrap());

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(&format!("key{}", i), &i).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // the file on disk reflects every mutation, not a torn interleaving
        let reloaded = KeyedStore::open(dir.path(), "s.json").unwrap();
        assert_eq!(reloaded.len().await, 16);
        for i in 0..16u64 {
            assert_eq!(reloaded.get::<u64>(&format!("key{}", i)).await, Some(i));
        }
    }

    #[tokio::test]
    async fn test_mismatched_shape_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedStore::open(dir.path(), "s.json").unwrap();
        store.put("ignored", &"not a list").await.unwrap();
        assert_eq!(store.get::<Vec<u64>>("ignored").await, None);
        let fallback: Vec<u64> = store.get_or_default("ignored").await;
        assert!(fallback.is_empty());
    }
}
