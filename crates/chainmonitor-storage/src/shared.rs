//! Process-wide shared store handle.
//!
//! Hosts that cannot thread an explicit handle through their call graph open
//! the store here once; the first successful open wins and every later call
//! gets the same handle, whatever path it asks for.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use chainmonitor_core::config::SqliteOptions;
use chainmonitor_core::error::StoreError;
use tracing::debug;

use crate::sqlite::SqliteStore;

static SHARED: OnceLock<Arc<SqliteStore>> = OnceLock::new();
static OPENING: Mutex<()> = Mutex::new(());

/// Open the shared store, or return the one already opened.
///
/// A failed open leaves the slot empty so a later call can retry.
pub fn open_shared(
    path: impl AsRef<Path>,
    options: &SqliteOptions,
) -> Result<Arc<SqliteStore>, StoreError> {
    if let Some(store) = SHARED.get() {
        return Ok(reuse(store, path.as_ref()));
    }

    let _guard = OPENING
        .lock()
        .map_err(|_| StoreError::Backend("shared store init lock poisoned".into()))?;
    if let Some(store) = SHARED.get() {
        return Ok(reuse(store, path.as_ref()));
    }

    let store = Arc::new(SqliteStore::open(path, options)?);
    Ok(Arc::clone(SHARED.get_or_init(|| store)))
}

/// The shared store, if one was opened.
pub fn shared() -> Option<Arc<SqliteStore>> {
    SHARED.get().cloned()
}

fn reuse(store: &Arc<SqliteStore>, requested: &Path) -> Arc<SqliteStore> {
    if store.path() != Some(requested) {
        debug!(
            requested = %requested.display(),
            open = ?store.path(),
            "shared monitor store already open, ignoring requested path"
        );
    }
    Arc::clone(store)
}
