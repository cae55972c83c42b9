//! Process-wide store registry
//!
//! Two independent `KeyedStore` instances pointed at the same backing file
//! would each hold their own save lock and could overwrite each other's
//! writes. The registry rules that out by construction: one shared instance
//! per store name for the process lifetime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use corvid_types::StoreError;

use crate::store::KeyedStore;

/// Hands out shared [`KeyedStore`] instances, one per backing file.
pub struct StoreRegistry {
    dir: PathBuf,
    stores: Mutex<HashMap<String, Arc<KeyedStore>>>,
}

impl StoreRegistry {
    /// Create a registry rooted at the given storage directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Storage root directory
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Open the store for `name`, loading its backing file on first use.
    /// Subsequent calls with the same name return the same instance.
    pub async fn open(&self, name: &str) -> Result<Arc<KeyedStore>, StoreError> {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(name) {
            return Ok(store.clone());
        }
        let store = Arc::new(KeyedStore::open(&self.dir, name)?);
        stores.insert(name.to_string(), store.clone());
        debug!(store = name, "registered store");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_name_returns_same_instance() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(dir.path());

        let a = registry.open("botadmin.json").await.unwrap();
        let b = registry.open("botadmin.json").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b), "expected one instance per file name");
    }

    #[tokio::test]
    async fn test_distinct_names_are_distinct_stores() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StoreRegistry::new(dir.path());

        let a = registry.open("reactions.json").await.unwrap();
        let b = registry.open("stats.json").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        a.put("only-in-a", &1u64).await.unwrap();
        assert!(!b.contains("only-in-a").await);
    }

    #[tokio::test]
    async fn test_open_surfaces_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"[1, 2").unwrap();
        let registry = StoreRegistry::new(dir.path());
        assert!(registry.open("bad.json").await.is_err());
    }
}
