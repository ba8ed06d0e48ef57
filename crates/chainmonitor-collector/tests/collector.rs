//! Collector hooks against the in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_primitives::{address, Address, B256, U256};
use chainmonitor_collector::{Collector, ContractCaller, ExecutionHooks};
use chainmonitor_core::config::{AppendStrategy, MonitorConfig};
use chainmonitor_core::types::ContractType;
use chainmonitor_core::{EventKind, KvStore};
use chainmonitor_evm::classifier::{ERC165_SIGNATURE, ERC20_SIGNATURES, ERC721_SIGNATURES};
use chainmonitor_evm::token::{input_for_decimals, input_for_name, input_for_symbol};
use chainmonitor_evm::{selector, ProxyConvention};
use chainmonitor_observability::MonitorMetrics;
use chainmonitor_storage::{EventStore, MemoryStore, SqliteStore};

const PROXY: Address = address!("1111111111111111111111111111111111111111");
const IMPL: Address = address!("2222222222222222222222222222222222222222");

fn tx(n: u8) -> B256 {
    B256::repeat_byte(n)
}

fn dispatcher(signatures: &[&str]) -> Vec<u8> {
    let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52];
    for sig in signatures {
        code.push(0x63);
        code.extend_from_slice(&selector(sig));
        code.push(0x14);
    }
    code
}

fn proxy_code() -> Vec<u8> {
    let slots = ProxyConvention::Eip1967.slots();
    let mut code = vec![0x60, 0x80, 0x7f];
    code.extend_from_slice(slots.implementation.as_slice());
    code.extend_from_slice(&[0x54, 0x7f]);
    code.extend_from_slice(slots.admin.as_slice());
    code.extend_from_slice(&[0x54, 0xf4]);
    code
}

fn impl_slot_reader(address: Address, slot: B256) -> Option<Vec<u8>> {
    if address == PROXY && slot == ProxyConvention::Eip1967.slots().implementation {
        let mut word = vec![0u8; 12];
        word.extend_from_slice(IMPL.as_slice());
        Some(word)
    } else {
        None
    }
}

fn collector() -> Collector<MemoryStore> {
    Collector::new(EventStore::new(MemoryStore::new())).with_metrics(MonitorMetrics::global())
}

fn abi_word(v: u64) -> Vec<u8> {
    U256::from(v).to_be_bytes::<32>().to_vec()
}

fn abi_string(s: &str) -> Vec<u8> {
    let mut out = abi_word(32);
    out.extend(abi_word(s.len() as u64));
    let mut data = s.as_bytes().to_vec();
    data.resize(32, 0);
    out.extend(data);
    out
}

struct FakeToken;

impl ContractCaller for FakeToken {
    fn call(&self, _to: Address, input: &[u8]) -> Option<Vec<u8>> {
        if input == input_for_name() {
            Some(abi_string("Wrapped Lat"))
        } else if input == input_for_symbol() {
            Some(abi_string("WLAT"))
        } else if input == input_for_decimals() {
            Some(abi_word(18))
        } else {
            None
        }
    }
}

#[test]
fn created_contracts_are_classified_in_order() {
    let c = collector();
    let mut erc721 = vec![ERC165_SIGNATURE];
    erc721.extend_from_slice(&ERC721_SIGNATURES);

    let a1 = address!("00000000000000000000000000000000000000a1");
    let a2 = address!("00000000000000000000000000000000000000a2");
    let a3 = address!("00000000000000000000000000000000000000a3");
    c.on_contract_created(tx(1), a1, &dispatcher(&ERC20_SIGNATURES));
    c.on_contract_created(tx(1), a2, &dispatcher(&erc721));
    c.on_contract_created(tx(1), a3, &[]);

    let created = c.created_contracts(&tx(1));
    let types: Vec<_> = created.iter().map(|i| i.contract_type).collect();
    assert_eq!(
        types,
        vec![ContractType::Erc20, ContractType::Erc721, ContractType::Evm]
    );
    assert!(created[0].token_name.is_none());
    assert!(c.created_contracts(&tx(2)).is_empty());
}

#[test]
fn token_metadata_is_read_when_caller_present() {
    let c = collector().with_contract_caller(Arc::new(FakeToken));
    c.on_contract_created(tx(1), IMPL, &dispatcher(&ERC20_SIGNATURES));
    c.on_contract_created(tx(1), PROXY, &[0x60, 0x80]);

    let created = c.created_contracts(&tx(1));
    assert_eq!(created[0].token_name.as_deref(), Some("Wrapped Lat"));
    assert_eq!(created[0].token_symbol.as_deref(), Some("WLAT"));
    assert_eq!(created[0].token_decimals, Some(18));
    assert!(created[0].token_total_supply.is_none());
    // non-token contracts are never queried
    assert!(created[1].token_name.is_none());
}

#[test]
fn destroyed_contracts_are_address_only() {
    let c = collector();
    c.on_contract_destroyed(tx(3), PROXY);
    let gone = c.suicided_contracts(&tx(3));
    assert_eq!(gone.len(), 1);
    assert_eq!(gone[0].address, PROXY);
    assert_eq!(gone[0].contract_type, ContractType::Evm);
    assert!(gone[0].code.is_empty());
}

#[test]
fn proxy_pair_is_recorded_once() {
    let c = collector();
    assert!(!c.is_proxied(&PROXY, &IMPL));

    let target = dispatcher(&ERC20_SIGNATURES);
    c.on_delegate_call(tx(4), PROXY, &proxy_code(), IMPL, &target, &impl_slot_reader);
    c.on_delegate_call(tx(4), PROXY, &proxy_code(), IMPL, &target, &impl_slot_reader);
    c.on_delegate_call(tx(5), PROXY, &proxy_code(), IMPL, &target, &impl_slot_reader);

    let patterns = c.proxy_patterns(&tx(4));
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].proxy.address, PROXY);
    assert_eq!(patterns[0].implementation.address, IMPL);
    assert_eq!(patterns[0].implementation.contract_type, ContractType::Erc20);
    assert!(c.proxy_patterns(&tx(5)).is_empty());
    assert!(c.is_proxied(&PROXY, &IMPL));
    assert!(!c.is_proxied(&IMPL, &PROXY));
}

#[test]
fn unconfirmed_delegate_call_sets_no_flag() {
    let c = collector();
    let empty = |_: Address, _: B256| -> Option<Vec<u8>> { None };
    c.on_delegate_call(tx(6), PROXY, &proxy_code(), IMPL, &dispatcher(&ERC20_SIGNATURES), &empty);
    assert!(c.proxy_patterns(&tx(6)).is_empty());
    assert!(!c.is_proxied(&PROXY, &IMPL));
}

#[test]
fn known_pair_skips_confirmation_reads() {
    let c = collector();
    let reads = AtomicUsize::new(0);
    let counting = |address: Address, slot: B256| -> Option<Vec<u8>> {
        reads.fetch_add(1, Ordering::SeqCst);
        impl_slot_reader(address, slot)
    };

    c.on_delegate_call(tx(11), PROXY, &proxy_code(), IMPL, &[], &counting);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert!(c.is_proxied(&PROXY, &IMPL));

    c.on_delegate_call(tx(12), PROXY, &proxy_code(), IMPL, &[], &counting);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert!(c.proxy_patterns(&tx(12)).is_empty());
}

#[test]
fn failed_append_leaves_flag_unset() {
    let c = collector();
    let key = EventKind::ProxyPattern.tx_key(&tx(13));
    c.events().store().put(key.as_bytes(), b"not json").unwrap();

    c.on_delegate_call(tx(13), PROXY, &proxy_code(), IMPL, &[], &impl_slot_reader);
    assert!(!c.is_proxied(&PROXY, &IMPL));
    assert_eq!(c.events().store().get(key.as_bytes()).unwrap(), b"not json");

    // the next transaction records the pair
    c.on_delegate_call(tx(14), PROXY, &proxy_code(), IMPL, &[], &impl_slot_reader);
    assert_eq!(c.proxy_patterns(&tx(14)).len(), 1);
    assert!(c.is_proxied(&PROXY, &IMPL));
}

#[test]
fn transfers_keep_order() {
    let c = collector();
    for n in 1..=3u64 {
        c.on_value_transfer(100, tx(7), PROXY, IMPL, U256::from(n));
    }
    let amounts: Vec<_> = c
        .embedded_transfers(&tx(7))
        .into_iter()
        .map(|t| t.amount)
        .collect();
    assert_eq!(amounts, vec![U256::from(1), U256::from(2), U256::from(3)]);
}

#[test]
fn closed_store_never_panics() {
    let c = collector();
    c.events().close().unwrap();

    c.on_contract_created(tx(8), PROXY, &[0x60]);
    c.on_contract_destroyed(tx(8), PROXY);
    c.on_value_transfer(1, tx(8), PROXY, IMPL, U256::from(1));
    c.on_delegate_call(tx(8), PROXY, &proxy_code(), IMPL, &[], &impl_slot_reader);

    assert!(c.created_contracts(&tx(8)).is_empty());
    assert!(c.embedded_transfers(&tx(8)).is_empty());
    assert!(!c.is_proxied(&PROXY, &IMPL));
}

#[test]
fn hooks_work_through_trait_object_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("monitor.sqlite"), &Default::default()).unwrap();
    let collector = Collector::new(EventStore::with_strategy(store, AppendStrategy::KeyLocked));

    {
        let hooks: &dyn ExecutionHooks = &collector;
        hooks.on_contract_created(tx(9), IMPL, &dispatcher(&ERC20_SIGNATURES));
        hooks.on_delegate_call(tx(9), PROXY, &proxy_code(), IMPL, &[], &impl_slot_reader);
    }

    assert_eq!(collector.created_contracts(&tx(9)).len(), 1);
    let patterns = collector.proxy_patterns(&tx(9));
    assert_eq!(patterns.len(), 1);
    // empty target is accepted and stays a bare EVM record
    assert_eq!(patterns[0].implementation.contract_type, ContractType::Evm);
}

#[test]
fn open_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig {
        db_path: dir.path().join("db/monitor.sqlite"),
        append_strategy: AppendStrategy::KeyLocked,
        ..MonitorConfig::default()
    };

    let collector = Collector::open(&config).unwrap();
    collector.on_contract_destroyed(tx(10), PROXY);
    collector.events().close().unwrap();

    let reopened = Collector::open(&config).unwrap();
    assert_eq!(reopened.events().strategy(), AppendStrategy::KeyLocked);
    assert_eq!(reopened.suicided_contracts(&tx(10)).len(), 1);
}
