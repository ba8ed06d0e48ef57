//! Function-selector fingerprints.
//!
//! The selector of a function is the first four bytes of the keccak256 hash of
//! its canonical signature:
//!   keccak256("transfer(address,uint256)")[..4] → a9059cbb
//!
//! Compiled bytecode usually embeds selectors as PUSH4 immediates in the
//! dispatcher, which is what the classifier searches for.

use tiny_keccak::{Hasher, Keccak};

/// keccak256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Raw 4-byte selector, usable as call input for a zero-argument function.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector as 8 lowercase hex chars without `0x`.
pub fn selector_hex(signature: &str) -> String {
    hex::encode(selector(signature))
}

/// Selector hex with every leading `"00"` pair removed.
///
/// This is the form searched for in bytecode, e.g.
/// `balanceOf(address,uint256)` → `00fdd58e` → `fdd58e`.
pub fn trimmed_selector_hex(signature: &str) -> String {
    trim_leading_zero_pairs(&selector_hex(signature)).to_string()
}

fn trim_leading_zero_pairs(mut s: &str) -> &str {
    while let Some(rest) = s.strip_prefix("00") {
        s = rest;
    }
    s
}
