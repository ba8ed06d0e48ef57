//! In-memory key-value backend.
//!
//! Keys are kept ordered, like the on-disk backend. Useful for tests and
//! ephemeral nodes that don't need persistence.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chainmonitor_core::error::StoreError;
use chainmonitor_core::store::KvStore;

/// In-memory store. All data is lost when the process exits.
pub struct MemoryStore {
    /// `None` once closed.
    entries: Mutex<Option<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Some(BTreeMap::new())),
        }
    }

    /// Number of stored keys (0 after close).
    pub fn len(&self) -> usize {
        self.lock()
            .ok()
            .and_then(|g| g.as_ref().map(BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys starting with `prefix`, in order.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.with_open(|map| {
            Ok(map
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, _)| k.clone())
                .collect())
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<BTreeMap<Vec<u8>, Vec<u8>>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn with_open<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.lock()?;
        match guard.as_mut() {
            Some(map) => f(map),
            None => Err(StoreError::Closed),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.with_open(|map| map.get(key).cloned().ok_or(StoreError::NotFound))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.with_open(|map| {
            map.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.with_open(|map| {
            map.remove(key);
            Ok(())
        })
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.with_open(|map| Ok(map.contains_key(key)))
    }

    fn close(&self) -> Result<(), StoreError> {
        self.lock()?.take();
        Ok(())
    }
}
