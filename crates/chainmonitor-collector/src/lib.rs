//! # chainmonitor-collector
//!
//! The synchronous façade an execution engine calls while running
//! transactions. Hooks classify contracts, detect proxies and append the
//! results to per-transaction records; the read side returns those records.
//!
//! ```text
//! execution hook → Collector → Classifier / ProxyDetector → EventStore
//! query          → Collector → EventStore
//! ```
//!
//! No hook returns an error: failures are logged and counted, and execution
//! continues.

pub mod collector;
pub mod hooks;

pub use chainmonitor_evm::{ContractCaller, StorageReader};
pub use collector::Collector;
pub use hooks::ExecutionHooks;
