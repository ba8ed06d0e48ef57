//! ChainMonitor metrics definitions.
//!
//! All metrics use OpenTelemetry conventions. Without an installed meter
//! provider the global meter is a no-op.

use chainmonitor_core::{ContractType, EventKind};
use opentelemetry::{
    metrics::{Counter, Meter},
    KeyValue,
};

/// Central metrics handle for the collector.
#[derive(Clone)]
pub struct MonitorMetrics {
    pub contracts_classified: Counter<u64>,
    pub proxies_detected: Counter<u64>,
    pub events_appended: Counter<u64>,
    pub store_errors: Counter<u64>,
}

impl MonitorMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            contracts_classified: meter
                .u64_counter("chainmonitor.contracts_classified")
                .with_description("Contracts classified at creation")
                .init(),
            proxies_detected: meter
                .u64_counter("chainmonitor.proxies_detected")
                .with_description("New proxy/implementation pairs recorded")
                .init(),
            events_appended: meter
                .u64_counter("chainmonitor.events_appended")
                .with_description("Values appended to per-transaction records")
                .init(),
            store_errors: meter
                .u64_counter("chainmonitor.store_errors")
                .with_description("Store reads or writes that failed and were swallowed")
                .init(),
        }
    }

    /// Metrics on the global meter provider.
    pub fn global() -> Self {
        Self::new(&opentelemetry::global::meter("chainmonitor"))
    }

    pub fn record_classified(&self, contract_type: ContractType) {
        self.contracts_classified
            .add(1, &[KeyValue::new("type", contract_type.as_str())]);
    }

    pub fn record_proxy(&self) {
        self.proxies_detected.add(1, &[]);
    }

    pub fn record_appended(&self, kind: EventKind) {
        self.events_appended
            .add(1, &[KeyValue::new("kind", kind.tag())]);
    }

    pub fn record_store_error(&self, operation: &str) {
        self.store_errors
            .add(1, &[KeyValue::new("operation", operation.to_string())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_on_noop_meter() {
        let metrics = MonitorMetrics::global();
        metrics.record_classified(ContractType::Erc20);
        metrics.record_proxy();
        metrics.record_appended(EventKind::ProxyPattern);
        metrics.record_store_error("append");
    }
}
