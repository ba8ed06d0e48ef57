//! Delegate-call proxy detection.
//!
//! A delegate call from `caller` to `target` is recorded as a proxy
//! relationship when all of the following hold:
//!
//! 1. the caller classifies as plain `EVM` (token contracts are not proxies),
//! 2. the caller's bytecode embeds both slots of at least one convention
//!    (see [`crate::slots`]),
//! 3. the target is either empty or classifies as something other than `EVM`,
//! 4. the caller's storage at a matched implementation slot holds the target.
//!
//! Any unmet condition yields `None`; detection never fails.

use alloy_primitives::{Address, B256};
use chainmonitor_core::types::{ContractType, ProxyPattern};
use tracing::debug;

use crate::classifier::{Classifier, SignatureMatcher, SubstringMatcher};
use crate::slots::ProxyConvention;

/// Read access to contract storage during execution.
pub trait StorageReader {
    /// Raw value at `slot` of `address`. `None` or an empty vec means unset.
    fn storage_at(&self, address: Address, slot: B256) -> Option<Vec<u8>>;
}

impl<F> StorageReader for F
where
    F: Fn(Address, B256) -> Option<Vec<u8>>,
{
    fn storage_at(&self, address: Address, slot: B256) -> Option<Vec<u8>> {
        self(address, slot)
    }
}

/// Interpret a storage word as an address stored in its low 20 bytes.
///
/// Shorter values are left-padded, longer ones keep their last 20 bytes.
/// Empty and all-zero values are `None`.
pub fn storage_to_address(value: &[u8]) -> Option<Address> {
    if value.is_empty() {
        return None;
    }
    let mut word = [0u8; 20];
    if value.len() >= 20 {
        word.copy_from_slice(&value[value.len() - 20..]);
    } else {
        word[20 - value.len()..].copy_from_slice(value);
    }
    let address = Address::from(word);
    (!address.is_zero()).then_some(address)
}

/// Conventions whose admin and implementation slots both appear in `bin_hex`.
pub fn matched_conventions(bin_hex: &str) -> Vec<ProxyConvention> {
    ProxyConvention::ALL
        .into_iter()
        .filter(|c| c.slots().both_present_in(bin_hex))
        .collect()
}

/// Proxy detector over a classifier strategy.
#[derive(Debug, Clone, Default)]
pub struct ProxyDetector<M = SubstringMatcher> {
    classifier: Classifier<M>,
}

impl ProxyDetector<SubstringMatcher> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: SignatureMatcher> ProxyDetector<M> {
    pub fn with_classifier(classifier: Classifier<M>) -> Self {
        Self { classifier }
    }

    pub fn detect(
        &self,
        caller: Address,
        caller_code: &[u8],
        target: Address,
        target_code: &[u8],
        storage: &dyn StorageReader,
    ) -> Option<ProxyPattern> {
        let proxy = self.classifier.inspect(caller, caller_code);
        if proxy.contract_type != ContractType::Evm || proxy.bin.is_empty() {
            return None;
        }
        let conventions = matched_conventions(&proxy.bin);
        if conventions.is_empty() {
            return None;
        }

        let implementation = self.classifier.inspect(target, target_code);
        if !target_code.is_empty() && implementation.contract_type == ContractType::Evm {
            debug!(%caller, %target, "delegate target is plain EVM, not a proxy implementation");
            return None;
        }

        let confirmed = conventions.iter().find(|convention| {
            let slot = convention.slots().implementation;
            storage
                .storage_at(caller, slot)
                .as_deref()
                .and_then(storage_to_address)
                == Some(target)
        });

        match confirmed {
            Some(convention) => {
                debug!(%caller, %target, %convention, "proxy pattern confirmed");
                Some(ProxyPattern {
                    proxy,
                    implementation,
                })
            }
            None => {
                debug!(%caller, %target, "implementation slot does not point at target");
                None
            }
        }
    }
}

/// Detect with the default substring matcher.
pub fn detect_proxy(
    caller: Address,
    caller_code: &[u8],
    target: Address,
    target_code: &[u8],
    storage: &dyn StorageReader,
) -> Option<ProxyPattern> {
    ProxyDetector::new().detect(caller, caller_code, target, target_code, storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ERC20_SIGNATURES;
    use crate::selector::selector;
    use alloy_primitives::address;
    use std::collections::HashMap;

    const PROXY: Address = address!("00000000000000000000000000000000000000aa");
    const IMPL: Address = address!("00000000000000000000000000000000000000bb");

    fn proxy_code(convention: ProxyConvention) -> Vec<u8> {
        let slots = convention.slots();
        let mut code = vec![0x60, 0x80, 0x60, 0x40, 0x52, 0x7f];
        code.extend_from_slice(slots.implementation.as_slice());
        code.extend_from_slice(&[0x54, 0x7f]);
        code.extend_from_slice(slots.admin.as_slice());
        code.push(0x54);
        code
    }

    fn erc20_code() -> Vec<u8> {
        let mut code = vec![0x60, 0x80];
        for sig in ERC20_SIGNATURES {
            code.push(0x63);
            code.extend_from_slice(&selector(sig));
        }
        code
    }

    fn word(address: Address) -> Vec<u8> {
        let mut w = vec![0u8; 12];
        w.extend_from_slice(address.as_slice());
        w
    }

    struct Slots(HashMap<(Address, B256), Vec<u8>>);

    impl StorageReader for Slots {
        fn storage_at(&self, address: Address, slot: B256) -> Option<Vec<u8>> {
            self.0.get(&(address, slot)).cloned()
        }
    }

    fn storage_with(convention: ProxyConvention, value: Vec<u8>) -> Slots {
        let mut map = HashMap::new();
        map.insert((PROXY, convention.slots().implementation), value);
        Slots(map)
    }

    #[test]
    fn storage_word_to_address() {
        assert_eq!(storage_to_address(&word(IMPL)), Some(IMPL));
        assert_eq!(storage_to_address(&[0xbb]), Some(IMPL));
        assert_eq!(storage_to_address(&[]), None);
        assert_eq!(storage_to_address(&[0u8; 32]), None);
    }

    #[test]
    fn eip1967_proxy_with_erc20_target() {
        let storage = storage_with(ProxyConvention::Eip1967, word(IMPL));
        let found = detect_proxy(
            PROXY,
            &proxy_code(ProxyConvention::Eip1967),
            IMPL,
            &erc20_code(),
            &storage,
        )
        .expect("proxy");
        assert_eq!(found.proxy.address, PROXY);
        assert_eq!(found.proxy.contract_type, ContractType::Evm);
        assert_eq!(found.implementation.address, IMPL);
        assert_eq!(found.implementation.contract_type, ContractType::Erc20);
    }

    #[test]
    fn zeppelinos_proxy_with_empty_target() {
        let storage = storage_with(ProxyConvention::Zeppelinos, word(IMPL));
        let found = detect_proxy(
            PROXY,
            &proxy_code(ProxyConvention::Zeppelinos),
            IMPL,
            &[],
            &storage,
        );
        assert!(found.is_some());
    }

    #[test]
    fn single_slot_is_not_a_proxy() {
        let mut code = vec![0x7f];
        code.extend_from_slice(ProxyConvention::Eip1967.slots().implementation.as_slice());
        let storage = storage_with(ProxyConvention::Eip1967, word(IMPL));
        assert!(detect_proxy(PROXY, &code, IMPL, &erc20_code(), &storage).is_none());
    }

    #[test]
    fn mixed_convention_slots_do_not_match() {
        let mut code = vec![0x7f];
        code.extend_from_slice(ProxyConvention::Eip1967.slots().implementation.as_slice());
        code.push(0x7f);
        code.extend_from_slice(ProxyConvention::Zeppelinos.slots().admin.as_slice());
        assert!(matched_conventions(&hex::encode(&code)).is_empty());
    }

    #[test]
    fn plain_evm_target_is_rejected() {
        let storage = storage_with(ProxyConvention::Eip1967, word(IMPL));
        let found = detect_proxy(
            PROXY,
            &proxy_code(ProxyConvention::Eip1967),
            IMPL,
            &[0x60, 0x80],
            &storage,
        );
        assert!(found.is_none());
    }

    #[test]
    fn storage_must_point_at_target() {
        let other = address!("00000000000000000000000000000000000000cc");
        let storage = storage_with(ProxyConvention::Eip1967, word(other));
        let code = proxy_code(ProxyConvention::Eip1967);
        assert!(detect_proxy(PROXY, &code, IMPL, &erc20_code(), &storage).is_none());

        let unset = Slots(HashMap::new());
        assert!(detect_proxy(PROXY, &code, IMPL, &erc20_code(), &unset).is_none());
    }

    #[test]
    fn token_caller_is_not_a_proxy() {
        let mut code = erc20_code();
        code.extend(proxy_code(ProxyConvention::Eip1967));
        let storage = storage_with(ProxyConvention::Eip1967, word(IMPL));
        assert!(detect_proxy(PROXY, &code, IMPL, &erc20_code(), &storage).is_none());
    }

    #[test]
    fn closure_reader() {
        let reader = |_: Address, slot: B256| {
            (slot == ProxyConvention::Eip1967.slots().implementation).then(|| word(IMPL))
        };
        let found = detect_proxy(
            PROXY,
            &proxy_code(ProxyConvention::Eip1967),
            IMPL,
            &erc20_code(),
            &reader,
        );
        assert!(found.is_some());
    }
}
