//! Per-guild partitioning of a single store entry
//!
//! A scoped table is one entry in a [`KeyedStore`] whose value is a mapping
//! from guild id to a per-guild payload. Every feature module (triggers,
//! disable lists, ban lists, stats) uses the same access pattern: reads
//! default to an empty payload when the guild is absent, and all mutation
//! goes through an explicit `put` that takes the new value, so a caller can
//! never mutate shared state in place and forget to persist it.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use corvid_types::StoreError;

use crate::store::KeyedStore;

/// Typed per-guild view over one store entry.
pub struct GuildScopedTable<T> {
    store: Arc<KeyedStore>,
    key: String,
    // serializes read-modify-write cycles for this entry
    update_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GuildScopedTable<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(store: Arc<KeyedStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            update_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Name of the underlying store (backing file name)
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Entry key this table lives under
    pub fn entry_key(&self) -> &str {
        &self.key
    }

    /// Read the payload for one guild. Absence is never an error: a guild
    /// with no entry reads as `T::default()`. Returns an owned snapshot.
    pub async fn get(&self, scope: u64) -> T {
        let map: BTreeMap<String, Value> = self.store.get_or_default(&self.key).await;
        match map.get(&scope.to_string()) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        store = self.store_name(),
                        key = %self.key,
                        scope,
                        "scope payload does not match expected shape: {}",
                        e
                    );
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    /// Replace the payload for one guild and persist. Returns the full entry
    /// value that was written, for callers that surface persist intents.
    pub async fn put(&self, scope: u64, payload: &T) -> Result<Value, StoreError> {
        let _guard = self.update_lock.lock().await;
        let mut map: BTreeMap<String, Value> = self.store.get_or_default(&self.key).await;
        let value = serde_json::to_value(payload).map_err(|source| StoreError::Serialize {
            key: self.key.clone(),
            source,
        })?;
        map.insert(scope.to_string(), value);
        self.store.put(&self.key, &map).await?;
        Ok(serde_json::to_value(&map).map_err(|source| StoreError::Serialize {
            key: self.key.clone(),
            source,
        })?)
    }

    /// Drop one guild's payload entirely and persist.
    pub async fn remove(&self, scope: u64) -> Result<(), StoreError> {
        let _guard = self.update_lock.lock().await;
        let mut map: BTreeMap<String, Value> = self.store.get_or_default(&self.key).await;
        if map.remove(&scope.to_string()).is_none() {
            return Ok(());
        }
        self.store.put(&self.key, &map).await
    }

    /// Guild ids that currently have a payload
    pub async fn scopes(&self) -> Vec<u64> {
        let map: BTreeMap<String, Value> = self.store.get_or_default(&self.key).await;
        map.keys().filter_map(|k| k.parse().ok()).collect()
    }
}
