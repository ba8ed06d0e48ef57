//! # chainmonitor-observability
//!
//! Logging and metrics for ChainMonitor.
//!
//! ## Built-in metrics
//! - `chainmonitor.contracts_classified` — counter, tagged with contract type
//! - `chainmonitor.proxies_detected`     — counter
//! - `chainmonitor.events_appended`      — counter, tagged with event kind
//! - `chainmonitor.store_errors`         — counter, tagged with operation
//!
//! ## Structured logging
//! Text or JSON logs through `tracing-subscriber`, levels configurable per
//! component.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::MonitorMetrics;
pub use tracing_setup::{build_directives, init_tracing};
