//! # chainmonitor-storage
//!
//! Storage backends for ChainMonitor and the event store built on them.
//!
//! | Backend       | Persistence | Use                              |
//! |---------------|-------------|----------------------------------|
//! | `MemoryStore` | none        | tests, ephemeral nodes           |
//! | `SqliteStore` | single file | production, one writer process   |
//!
//! Both implement [`chainmonitor_core::KvStore`]; [`EventStore`] layers the
//! per-transaction list records and de-duplication flags on top.

pub mod event_store;
pub mod memory;
pub mod shared;
pub mod sqlite;

pub use event_store::{EventStore, FLAG_VALUE};
pub use memory::MemoryStore;
pub use shared::{open_shared, shared};
pub use sqlite::SqliteStore;
