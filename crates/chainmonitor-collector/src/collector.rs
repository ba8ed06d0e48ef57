//! The collector façade.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use chainmonitor_core::types::{ContractInfo, EmbedTransfer, ProxyPattern};
use chainmonitor_core::{EventKind, KvStore, MonitorConfig, MonitorError};
use chainmonitor_evm::token::read_token_metadata;
use chainmonitor_evm::{Classifier, ContractCaller, ProxyDetector, StorageReader};
use chainmonitor_observability::MonitorMetrics;
use chainmonitor_storage::{EventStore, SqliteStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::hooks::ExecutionHooks;

/// Records what contracts do during execution, keyed by transaction hash.
///
/// Every hook is infallible from the caller's point of view. Replaying a
/// transaction appends its records again; de-duplication is only done for
/// proxy relationships.
pub struct Collector<S> {
    events: EventStore<S>,
    classifier: Classifier,
    detector: ProxyDetector,
    metrics: Option<MonitorMetrics>,
    caller: Option<Arc<dyn ContractCaller>>,
}

impl<S: KvStore> Collector<S> {
    pub fn new(events: EventStore<S>) -> Self {
        Self {
            events,
            classifier: Classifier::new(),
            detector: ProxyDetector::new(),
            metrics: None,
            caller: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MonitorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enable token metadata reads for contracts classified as tokens.
    pub fn with_contract_caller(mut self, caller: Arc<dyn ContractCaller>) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn events(&self) -> &EventStore<S> {
        &self.events
    }

    // ─── Write side ──────────────────────────────────────────────────────────

    pub fn on_contract_created(&self, tx_hash: B256, address: Address, code: &[u8]) {
        let info = self.enrich(self.classifier.inspect(address, code));
        info!(
            tx = %tx_hash,
            %address,
            contract_type = %info.contract_type,
            "contract created"
        );
        if let Some(m) = &self.metrics {
            m.record_classified(info.contract_type);
        }
        self.record(EventKind::CreatedContract, &tx_hash, info);
    }

    pub fn on_contract_destroyed(&self, tx_hash: B256, address: Address) {
        info!(tx = %tx_hash, %address, "contract self-destructed");
        self.record(
            EventKind::SuicidedContract,
            &tx_hash,
            ContractInfo::address_only(address),
        );
    }

    /// A pair already on record is skipped before any detection work. The flag
    /// is only set once the pattern has been appended.
    pub fn on_delegate_call(
        &self,
        tx_hash: B256,
        caller: Address,
        caller_code: &[u8],
        target: Address,
        target_code: &[u8],
        storage: &dyn StorageReader,
    ) {
        match self.events.has_flag(&caller, &target) {
            Ok(true) => {
                debug!(tx = %tx_hash, proxy = %caller, implementation = %target, "proxy pattern already known");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(tx = %tx_hash, error = %e, "failed to read proxy pattern flag");
                self.store_error("has_flag");
                return;
            }
        }

        let Some(pattern) = self
            .detector
            .detect(caller, caller_code, target, target_code, storage)
        else {
            return;
        };

        info!(tx = %tx_hash, proxy = %caller, implementation = %target, "proxy pattern discovered");
        if let Some(m) = &self.metrics {
            m.record_proxy();
        }
        let pattern = ProxyPattern {
            proxy: pattern.proxy,
            implementation: self.enrich(pattern.implementation),
        };
        if !self.record(EventKind::ProxyPattern, &tx_hash, pattern) {
            return;
        }
        if let Err(e) = self.events.set_flag(&caller, &target) {
            error!(tx = %tx_hash, error = %e, "failed to set proxy pattern flag");
            self.store_error("set_flag");
        }
    }

    pub fn on_value_transfer(
        &self,
        block_number: u64,
        tx_hash: B256,
        from: Address,
        to: Address,
        amount: U256,
    ) {
        info!(block = block_number, tx = %tx_hash, %from, %to, %amount, "embedded transfer");
        self.record(
            EventKind::EmbedTransfer,
            &tx_hash,
            EmbedTransfer {
                tx_hash,
                from,
                to,
                amount,
            },
        );
    }

    // ─── Read side ───────────────────────────────────────────────────────────

    pub fn created_contracts(&self, tx_hash: &B256) -> Vec<ContractInfo> {
        self.load(EventKind::CreatedContract, tx_hash)
    }

    pub fn suicided_contracts(&self, tx_hash: &B256) -> Vec<ContractInfo> {
        self.load(EventKind::SuicidedContract, tx_hash)
    }

    pub fn proxy_patterns(&self, tx_hash: &B256) -> Vec<ProxyPattern> {
        self.load(EventKind::ProxyPattern, tx_hash)
    }

    pub fn embedded_transfers(&self, tx_hash: &B256) -> Vec<EmbedTransfer> {
        self.load(EventKind::EmbedTransfer, tx_hash)
    }

    /// Whether the ordered `(proxy, implementation)` pair was recorded before.
    /// Store failures read as "not seen".
    pub fn is_proxied(&self, proxy: &Address, implementation: &Address) -> bool {
        self.events.has_flag(proxy, implementation).unwrap_or_else(|e| {
            error!(%proxy, %implementation, error = %e, "failed to read proxy pattern flag");
            self.store_error("has_flag");
            false
        })
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn enrich(&self, info: ContractInfo) -> ContractInfo {
        match &self.caller {
            Some(caller) if info.contract_type.is_token() => {
                let meta = read_token_metadata(caller.as_ref(), info.address);
                info.with_token_metadata(meta)
            }
            _ => info,
        }
    }

    /// Append `value` to the `kind` list of `tx_hash`. Returns whether it was stored.
    fn record<T: Serialize + DeserializeOwned>(
        &self,
        kind: EventKind,
        tx_hash: &B256,
        value: T,
    ) -> bool {
        match self.events.append_for_tx(kind, tx_hash, value) {
            Ok(len) => {
                debug!(tx = %tx_hash, %kind, len, "record appended");
                if let Some(m) = &self.metrics {
                    m.record_appended(kind);
                }
                true
            }
            Err(e) => {
                error!(tx = %tx_hash, %kind, error = %e, "failed to append record");
                self.store_error("append");
                false
            }
        }
    }

    fn load<T: DeserializeOwned>(&self, kind: EventKind, tx_hash: &B256) -> Vec<T> {
        match self.events.get_for_tx(kind, tx_hash) {
            Ok(list) => {
                debug!(tx = %tx_hash, %kind, len = list.len(), "record loaded");
                list
            }
            Err(e) => {
                error!(tx = %tx_hash, %kind, error = %e, "failed to load record");
                self.store_error("get");
                Vec::new()
            }
        }
    }

    fn store_error(&self, operation: &str) {
        if let Some(m) = &self.metrics {
            m.record_store_error(operation);
        }
    }
}

impl Collector<SqliteStore> {
    /// Open the SQLite store named by `config` and build a collector on it.
    pub fn open(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let store = SqliteStore::open(&config.db_path, &config.sqlite)?;
        Ok(Self::new(EventStore::with_strategy(
            store,
            config.append_strategy,
        )))
    }
}

impl<S: KvStore> ExecutionHooks for Collector<S> {
    fn on_contract_created(&self, tx_hash: B256, address: Address, code: &[u8]) {
        Collector::on_contract_created(self, tx_hash, address, code)
    }

    fn on_contract_destroyed(&self, tx_hash: B256, address: Address) {
        Collector::on_contract_destroyed(self, tx_hash, address)
    }

    fn on_delegate_call(
        &self,
        tx_hash: B256,
        caller: Address,
        caller_code: &[u8],
        target: Address,
        target_code: &[u8],
        storage: &dyn StorageReader,
    ) {
        Collector::on_delegate_call(self, tx_hash, caller, caller_code, target, target_code, storage)
    }

    fn on_value_transfer(
        &self,
        block_number: u64,
        tx_hash: B256,
        from: Address,
        to: Address,
        amount: U256,
    ) {
        Collector::on_value_transfer(self, block_number, tx_hash, from, to, amount)
    }
}
