//! SQLite-backed key-value store.
//!
//! A single table holds every record as an opaque blob pair; the primary-key
//! B-tree keeps keys ordered.
//!
//! ## Schema
//! ```sql
//! CREATE TABLE kv (
//!     key   BLOB PRIMARY KEY,
//!     value BLOB NOT NULL
//! ) WITHOUT ROWID;
//! ```
//!
//! ## Repair on open
//! An existing file is checked with `PRAGMA quick_check`. A failing check is
//! followed by `REINDEX` + `VACUUM`; if the file is still damaged (or is not a
//! database at all) it is renamed to `<name>.corrupt-<timestamp>` and a fresh
//! store is created in its place. [`SqliteStore::open_read_only`] runs the same
//! check but never repairs, renames or creates anything.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chainmonitor_core::config::SqliteOptions;
use chainmonitor_core::error::StoreError;
use chainmonitor_core::store::KvStore;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use tracing::{info, warn};

/// SQLite store.
///
/// Thread-safe via an internal `Arc<Mutex<..>>` around one connection.
/// Clones share the connection; closing one closes all.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`, repairing or quarantining a damaged file.
    pub fn open(path: impl AsRef<Path>, options: &SqliteOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = match open_checked(path, options) {
            Ok(conn) => conn,
            Err(StoreError::Corrupted { reason }) => {
                let moved = quarantine(path)?;
                warn!(
                    path = %path.display(),
                    quarantined = %moved.display(),
                    %reason,
                    "monitor store unrecoverable, starting from an empty store"
                );
                open_connection(path, options)?
            }
            Err(e) => return Err(e),
        };

        info!(path = %path.display(), "monitor store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing store for reading. A damaged file is reported as
    /// [`StoreError::Corrupted`] and left as it is; writes fail.
    pub fn open_read_only(
        path: impl AsRef<Path>,
        options: &SqliteOptions,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(sqlite_err)?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))
            .map_err(sqlite_err)?;
        quick_check(&conn).map_err(|reason| StoreError::Corrupted { reason })?;

        info!(path = %path.display(), "monitor store opened read-only");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (useful for tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        let options = SqliteOptions {
            wal: false,
            ..SqliteOptions::default()
        };
        configure(&conn, &options)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored keys.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as u64)
                .map_err(sqlite_err)
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".into()))
    }

    fn with_conn<R>(
        &self,
        f: impl FnOnce(&Connection) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let guard = self.lock()?;
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StoreError::Closed),
        }
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()
            .map_err(sqlite_err)?
            .ok_or(StoreError::NotFound)
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(sqlite_err)?;
            Ok(())
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map_err(sqlite_err)?;
            Ok(())
        })
    }

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM kv WHERE key = ?1", params![key], |_| Ok(()))
                .optional()
                .map_err(sqlite_err)?;
            Ok(found.is_some())
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| sqlite_err(e))?;
            info!(path = ?self.path, "monitor store closed");
        }
        Ok(())
    }
}

fn open_connection(path: &Path, options: &SqliteOptions) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(sqlite_err)?;
    configure(&conn, options)?;
    Ok(conn)
}

fn configure(conn: &Connection, options: &SqliteOptions) -> Result<(), StoreError> {
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))
        .map_err(sqlite_err)?;

    if options.wal {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(sqlite_err)?;
    }
    // negative cache_size is in KiB
    conn.execute_batch(&format!("PRAGMA cache_size=-{};", options.cache_size_kib))
        .map_err(sqlite_err)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   BLOB PRIMARY KEY,
            value BLOB NOT NULL
        ) WITHOUT ROWID;",
    )
    .map_err(sqlite_err)
}

/// Open and verify; try an in-place repair before giving up.
fn open_checked(path: &Path, options: &SqliteOptions) -> Result<Connection, StoreError> {
    let conn = open_connection(path, options)?;
    let reason = match quick_check(&conn) {
        Ok(()) => return Ok(conn),
        Err(reason) => reason,
    };

    warn!(path = %path.display(), %reason, "monitor store integrity check failed, repairing");
    if let Err(e) = conn.execute_batch("REINDEX; VACUUM;") {
        return Err(StoreError::Corrupted {
            reason: format!("repair failed: {e}"),
        });
    }
    quick_check(&conn)
        .map(|()| conn)
        .map_err(|reason| StoreError::Corrupted { reason })
}

fn quick_check(conn: &Connection) -> Result<(), String> {
    let result: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| e.to_string())?;
    if result.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(result)
    }
}

/// Move a damaged database (and its WAL sidecars) out of the way.
fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "monitor.sqlite".to_string());
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let target = path.with_file_name(format!("{name}.corrupt-{stamp}"));

    std::fs::rename(path, &target)?;
    for suffix in ["-wal", "-shm"] {
        let sidecar = path.with_file_name(format!("{name}{suffix}"));
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }
    }
    Ok(target)
}

fn sqlite_err(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => StoreError::Corrupted {
            reason: e.to_string(),
        },
        _ => StoreError::Backend(format!("sqlite: {e}")),
    }
}
