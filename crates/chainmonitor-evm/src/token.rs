//! Token metadata read through the ERC-20 style view functions.
//!
//! Call inputs are the bare 4-byte selectors (all four functions take no
//! arguments). Outputs are decoded as ABI return parameters with
//! `alloy-core`'s dynamic ABI types. Malformed output decodes to the empty
//! default rather than an error.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use chainmonitor_core::types::TokenMetadata;
use tracing::debug;

use crate::selector::selector;

/// Call input for `name()`.
pub fn input_for_name() -> [u8; 4] {
    selector("name()")
}

/// Call input for `symbol()`.
pub fn input_for_symbol() -> [u8; 4] {
    selector("symbol()")
}

/// Call input for `decimals()`.
pub fn input_for_decimals() -> [u8; 4] {
    selector("decimals()")
}

/// Call input for `totalSupply()`.
pub fn input_for_total_supply() -> [u8; 4] {
    selector("totalSupply()")
}

/// Read-only contract call against current state.
///
/// Returns the raw return data, or `None` when the call reverted or could not
/// be executed.
pub trait ContractCaller: Send + Sync {
    fn call(&self, to: Address, input: &[u8]) -> Option<Vec<u8>>;
}

pub fn unpack_name(output: &[u8]) -> String {
    decode_string(output)
}

pub fn unpack_symbol(output: &[u8]) -> String {
    decode_string(output)
}

/// `uint8` output. Values that do not fit are rejected as malformed.
pub fn unpack_decimals(output: &[u8]) -> u8 {
    decode_uint(output, 8)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or_default()
}

pub fn unpack_total_supply(output: &[u8]) -> U256 {
    decode_uint(output, 256).unwrap_or_default()
}

/// Query all four view functions of `token`. Failed calls leave defaults.
pub fn read_token_metadata(caller: &dyn ContractCaller, token: Address) -> TokenMetadata {
    let call = |input: [u8; 4]| caller.call(token, &input).unwrap_or_default();
    let meta = TokenMetadata {
        name: unpack_name(&call(input_for_name())),
        symbol: unpack_symbol(&call(input_for_symbol())),
        decimals: unpack_decimals(&call(input_for_decimals())),
        total_supply: unpack_total_supply(&call(input_for_total_supply())),
    };
    debug!(%token, name = %meta.name, symbol = %meta.symbol, decimals = meta.decimals, "token metadata");
    meta
}

fn decode_output(output: &[u8], ty: &DynSolType) -> Option<DynSolValue> {
    ty.abi_decode_params(output)
        .map_err(|e| debug!(error = %e, "malformed call output"))
        .ok()
}

fn decode_string(output: &[u8]) -> String {
    match decode_output(output, &DynSolType::String) {
        Some(DynSolValue::String(s)) => s,
        _ => String::new(),
    }
}

fn decode_uint(output: &[u8], bits: usize) -> Option<U256> {
    match decode_output(output, &DynSolType::Uint(bits))? {
        DynSolValue::Uint(v, _) => Some(v),
        _ => None,
    }
}
