//! # chainmonitor-core
//!
//! Types, errors, configuration and the key-value store trait shared by every
//! ChainMonitor crate. The classifier, proxy detector, storage backends and
//! collector are all built on the interfaces defined here.

pub mod config;
pub mod error;
pub mod event;
pub mod serde_number;
pub mod store;
pub mod types;

pub use config::{AppendStrategy, LogConfig, MonitorConfig, SqliteOptions};
pub use error::{MonitorError, StoreError};
pub use event::EventKind;
pub use store::KvStore;
pub use types::{
    Capabilities, Classification, ContractInfo, ContractType, EmbedTransfer, ProxyPattern,
    TokenMetadata,
};
