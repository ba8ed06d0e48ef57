//! Append-on-write event records over any [`KvStore`].
//!
//! Each record is a JSON list stored under `<tag>_<discriminator>`. An append
//! reads the list (empty if absent), pushes one value and writes the whole list
//! back. With [`AppendStrategy::Unlocked`] two concurrent appends to one key can
//! race and the later write wins; [`AppendStrategy::KeyLocked`] serializes
//! appends per key through one `EventStore`. The lock map belongs to the
//! instance, so two `EventStore`s over the same backend (for example the
//! [`shared`](crate::shared) handle) still race; share one `EventStore` instead.
//!
//! De-duplication flags are single-byte values under
//! `proxyPatternFlagKey_<proxy>_<implementation>` and are never cleared.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256};
use chainmonitor_core::config::AppendStrategy;
use chainmonitor_core::error::{MonitorError, StoreError};
use chainmonitor_core::event::{proxy_flag_key, tx_discriminator, EventKind};
use chainmonitor_core::store::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

/// Value written for a set de-duplication flag.
pub const FLAG_VALUE: &[u8] = &[0x01];

pub struct EventStore<S> {
    store: S,
    strategy: AppendStrategy,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: KvStore> EventStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_strategy(store, AppendStrategy::default())
    }

    pub fn with_strategy(store: S, strategy: AppendStrategy) -> Self {
        Self {
            store,
            strategy,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> AppendStrategy {
        self.strategy
    }

    /// The underlying key-value store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append `value` to the list at `(kind, discriminator)`.
    ///
    /// Returns the list length after the append. Existing data that does not
    /// decode as a list of `T` is reported and left untouched.
    pub fn append<T>(
        &self,
        kind: EventKind,
        discriminator: &str,
        value: T,
    ) -> Result<usize, MonitorError>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = kind.key(discriminator);
        match self.strategy {
            AppendStrategy::Unlocked => self.read_push_write(&key, value),
            AppendStrategy::KeyLocked => {
                let lock = self.key_lock(&key)?;
                let result = {
                    let _guard = lock.lock().map_err(|_| poisoned())?;
                    self.read_push_write(&key, value)
                };
                self.release_key_lock(&key, lock)?;
                result
            }
        }
    }

    /// All values at `(kind, discriminator)`, empty when nothing was stored.
    pub fn get<T: DeserializeOwned>(
        &self,
        kind: EventKind,
        discriminator: &str,
    ) -> Result<Vec<T>, MonitorError> {
        self.read_list(&kind.key(discriminator))
    }

    pub fn append_for_tx<T>(
        &self,
        kind: EventKind,
        tx_hash: &B256,
        value: T,
    ) -> Result<usize, MonitorError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.append(kind, &tx_discriminator(tx_hash), value)
    }

    pub fn get_for_tx<T: DeserializeOwned>(
        &self,
        kind: EventKind,
        tx_hash: &B256,
    ) -> Result<Vec<T>, MonitorError> {
        self.get(kind, &tx_discriminator(tx_hash))
    }

    /// Mark the ordered `(proxy, implementation)` pair as observed.
    pub fn set_flag(&self, proxy: &Address, implementation: &Address) -> Result<(), MonitorError> {
        let key = proxy_flag_key(proxy, implementation);
        self.store.put(key.as_bytes(), FLAG_VALUE)?;
        trace!(%key, "flag set");
        Ok(())
    }

    /// `true` once [`set_flag`](Self::set_flag) ran for this ordered pair.
    pub fn has_flag(&self, proxy: &Address, implementation: &Address) -> Result<bool, MonitorError> {
        let key = proxy_flag_key(proxy, implementation);
        Ok(self.store.has(key.as_bytes())?)
    }

    pub fn close(&self) -> Result<(), MonitorError> {
        Ok(self.store.close()?)
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, MonitorError> {
        match self.store.get(key.as_bytes()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(StoreError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_push_write<T>(&self, key: &str, value: T) -> Result<usize, MonitorError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut list: Vec<T> = self.read_list(key)?;
        list.push(value);
        let bytes = serde_json::to_vec(&list)?;
        self.store.put(key.as_bytes(), &bytes)?;
        trace!(%key, len = list.len(), "record appended");
        Ok(list.len())
    }

    fn key_lock(&self, key: &str) -> Result<Arc<Mutex<()>>, MonitorError> {
        let mut locks = self.key_locks.lock().map_err(|_| poisoned())?;
        Ok(locks.entry(key.to_string()).or_default().clone())
    }

    /// Drop the per-key lock once no other appender holds it.
    fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) -> Result<(), MonitorError> {
        let mut locks = self.key_locks.lock().map_err(|_| poisoned())?;
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.key_locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

fn poisoned() -> MonitorError {
    StoreError::Backend("event store lock poisoned".into()).into()
}
