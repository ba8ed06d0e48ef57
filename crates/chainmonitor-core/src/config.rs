//! Monitor configuration.
//!
//! Loaded from YAML (or built in code), then overridden by environment
//! variables and finally by CLI flags:
//!
//! ```yaml
//! db_path: ./monitordb/monitor.sqlite
//! append_strategy: key_locked
//! sqlite:
//!   busy_timeout_ms: 5000
//!   cache_size_kib: 8192
//!   wal: true
//! log:
//!   level: info
//!   json: false
//!   components:
//!     chainmonitor_storage: debug
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::MonitorError;

/// Overrides `db_path`.
pub const ENV_DB_PATH: &str = "CHAINMONITOR_DB_PATH";
/// Overrides `log.level`.
pub const ENV_LOG: &str = "CHAINMONITOR_LOG";

/// How list appends are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendStrategy {
    /// Plain read-modify-write. Concurrent appends to one key may lose a value.
    #[default]
    Unlocked,
    /// Appends to the same key are serialized by a per-key lock held by the
    /// `EventStore` instance.
    KeyLocked,
}

/// Tuning knobs for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteOptions {
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Page cache size in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
    #[serde(default = "default_true")]
    pub wal: bool,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_cache_size_kib() -> u32 {
    8 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            cache_size_kib: default_cache_size_kib(),
            wal: true,
        }
    }
}

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub append_strategy: AppendStrategy,
    #[serde(default)]
    pub sqlite: SqliteOptions,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("monitordb/monitor.sqlite")
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            append_strategy: AppendStrategy::default(),
            sqlite: SqliteOptions::default(),
            log: LogConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, MonitorError> {
        serde_yaml::from_str(s).map_err(|e| MonitorError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    /// Apply `CHAINMONITOR_*` environment overrides.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_DB_PATH).ok(),
            std::env::var(ENV_LOG).ok(),
        )
    }

    fn apply_overrides(mut self, db_path: Option<String>, log_level: Option<String>) -> Self {
        if let Some(p) = db_path.filter(|p| !p.is_empty()) {
            self.db_path = PathBuf::from(p);
        }
        if let Some(l) = log_level.filter(|l| !l.is_empty()) {
            self.log.level = l;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_yaml() {
        let cfg = MonitorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("monitordb/monitor.sqlite"));
        assert_eq!(cfg.append_strategy, AppendStrategy::Unlocked);
        assert!(cfg.sqlite.wal);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn parses_full_yaml() {
        let yaml = "
db_path: /var/lib/monitor.sqlite
append_strategy: key_locked
sqlite:
  busy_timeout_ms: 100
  wal: false
log:
  level: debug
  json: true
  components:
    chainmonitor_storage: trace
";
        let cfg = MonitorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.append_strategy, AppendStrategy::KeyLocked);
        assert_eq!(cfg.sqlite.busy_timeout_ms, 100);
        assert_eq!(cfg.sqlite.cache_size_kib, 8 * 1024);
        assert!(!cfg.sqlite.wal);
        assert!(cfg.log.json);
        assert_eq!(cfg.log.components["chainmonitor_storage"], "trace");
    }

    #[test]
    fn bad_yaml_is_config_error() {
        let err = MonitorConfig::from_yaml_str("append_strategy: sometimes").unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn overrides_replace_values() {
        let cfg = MonitorConfig::default()
            .apply_overrides(Some("/tmp/x.sqlite".into()), Some("warn".into()));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(cfg.log.level, "warn");

        let untouched = MonitorConfig::default().apply_overrides(Some(String::new()), None);
        assert_eq!(untouched.db_path, default_db_path());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.yaml");
        std::fs::write(&path, "db_path: data.sqlite\n").unwrap();
        let cfg = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("data.sqlite"));
    }
}
