//! Storage slots of the upgradeable-proxy conventions.
//!
//! | Convention | Slot           | Derivation                                         |
//! |------------|----------------|----------------------------------------------------|
//! | EIP-1967   | implementation | `keccak256("eip1967.proxy.implementation") - 1`    |
//! | EIP-1967   | admin          | `keccak256("eip1967.proxy.admin") - 1`             |
//! | zeppelinos | implementation | `keccak256("org.zeppelinos.proxy.implementation")` |
//! | zeppelinos | admin          | `keccak256("org.zeppelinos.proxy.admin")`          |
//!
//! Slots are derived once per process and shared afterwards. The EIP-1967
//! slots are rendered as big-integer hex (leading zero bytes dropped), the
//! zeppelinos slots as the full 32-byte hash.

use alloy_primitives::{B256, U256};
use std::sync::OnceLock;

use crate::selector::keccak256;

/// An upgradeable-proxy storage convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyConvention {
    Eip1967,
    /// Pre-EIP-1967 OpenZeppelin (zeppelinos) proxies.
    Zeppelinos,
}

impl ProxyConvention {
    pub const ALL: [ProxyConvention; 2] = [ProxyConvention::Eip1967, ProxyConvention::Zeppelinos];

    pub fn slots(&self) -> &'static SlotPair {
        static EIP1967: OnceLock<SlotPair> = OnceLock::new();
        static ZEPPELINOS: OnceLock<SlotPair> = OnceLock::new();
        match self {
            Self::Eip1967 => EIP1967.get_or_init(|| {
                SlotPair::new(
                    decremented_slot("eip1967.proxy.implementation"),
                    decremented_slot("eip1967.proxy.admin"),
                    trimmed_hex,
                )
            }),
            Self::Zeppelinos => ZEPPELINOS.get_or_init(|| {
                SlotPair::new(
                    hashed_slot("org.zeppelinos.proxy.implementation"),
                    hashed_slot("org.zeppelinos.proxy.admin"),
                    full_hex,
                )
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eip1967 => "eip1967",
            Self::Zeppelinos => "zeppelinos",
        }
    }
}

impl std::fmt::Display for ProxyConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implementation and admin slot of one convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPair {
    pub implementation: B256,
    pub admin: B256,
    implementation_hex: String,
    admin_hex: String,
}

impl SlotPair {
    fn new(implementation: B256, admin: B256, render: fn(&B256) -> String) -> Self {
        Self {
            implementation_hex: render(&implementation),
            admin_hex: render(&admin),
            implementation,
            admin,
        }
    }

    /// Implementation slot as searched for in bytecode (no `0x`).
    pub fn implementation_hex(&self) -> &str {
        &self.implementation_hex
    }

    /// Admin slot as searched for in bytecode (no `0x`).
    pub fn admin_hex(&self) -> &str {
        &self.admin_hex
    }

    /// `true` when the bytecode hex embeds both slots.
    pub fn both_present_in(&self, bin_hex: &str) -> bool {
        bin_hex.contains(&self.admin_hex) && bin_hex.contains(&self.implementation_hex)
    }
}

fn hashed_slot(label: &str) -> B256 {
    B256::from(keccak256(label.as_bytes()))
}

fn decremented_slot(label: &str) -> B256 {
    let value = U256::from_be_bytes(keccak256(label.as_bytes())).wrapping_sub(U256::from(1));
    B256::from(value.to_be_bytes::<32>())
}

/// Big-integer hex rendering: leading zero bytes are not emitted.
fn trimmed_hex(slot: &B256) -> String {
    let start = slot.iter().position(|b| *b != 0).unwrap_or(slot.len());
    hex::encode(&slot[start..])
}

fn full_hex(slot: &B256) -> String {
    hex::encode(slot)
}
