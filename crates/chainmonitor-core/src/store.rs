//! The ordered byte-string key-value interface every backend implements.

use std::sync::Arc;

use crate::error::StoreError;

/// Embedded key-value store.
///
/// `get` reports an absent key as [`StoreError::NotFound`]; every other error
/// is a real backend failure. Calls after [`close`](KvStore::close) return
/// [`StoreError::Closed`].
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// `Ok(false)` when the key is absent, `Err` only on backend failure.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Release the underlying handle. Idempotent.
    fn close(&self) -> Result<(), StoreError>;
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        (**self).has(key)
    }

    fn close(&self) -> Result<(), StoreError> {
        (**self).close()
    }
}
