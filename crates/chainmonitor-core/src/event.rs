//! Event-kind tags and key construction for the monitor store.
//!
//! Every stored value lives under `<tag>_<discriminator>`:
//!
//! | Tag                   | Discriminator                  | Value             | Since |
//! |-----------------------|--------------------------------|-------------------|-------|
//! | `EmbedTransferKey`    | `0x`-hex tx hash               | `[EmbedTransfer]` | v1    |
//! | `CreatedContractKey`  | `0x`-hex tx hash               | `[ContractInfo]`  | v1    |
//! | `SuicidedContractKey` | `0x`-hex tx hash               | `[ContractInfo]`  | v1    |
//! | `ProxyPatternKey`     | `0x`-hex tx hash               | `[ProxyPattern]`  | v2    |
//! | `proxyPatternFlagKey` | `0x`-hex proxy `_` `0x`-hex impl | `0x01`          | v2    |
//!
//! Retired tags from the first store layout. They are neither read nor written,
//! and no current tag may reuse them:
//!
//! | Tag                | Discriminator    | Value                                  | Since | Replaced by        |
//! |--------------------|------------------|----------------------------------------|-------|--------------------|
//! | `EmbedTransferTx`  | `0x`-hex tx hash | `[EmbedTransfer]`                      | v0    | `EmbedTransferKey` |
//! | `ProxyContractKey` | `0x`-hex tx hash | proxy/impl addresses and bytecode hex  | v0    | `ProxyPatternKey`  |
//!
//! Tags are append-only: a format change gets a new tag rather than a migration
//! of an existing one.

use alloy_primitives::{Address, B256};

/// Tags of the v0 layout, kept out of use.
pub const RETIRED_TAGS: [&str; 2] = ["EmbedTransferTx", "ProxyContractKey"];

/// Namespace of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EmbedTransfer,
    CreatedContract,
    SuicidedContract,
    ProxyPattern,
    ProxyPatternFlag,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::EmbedTransfer,
        Self::CreatedContract,
        Self::SuicidedContract,
        Self::ProxyPattern,
        Self::ProxyPatternFlag,
    ];

    /// The persisted tag string. These are part of the on-disk format.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::EmbedTransfer => "EmbedTransferKey",
            Self::CreatedContract => "CreatedContractKey",
            Self::SuicidedContract => "SuicidedContractKey",
            Self::ProxyPattern => "ProxyPatternKey",
            Self::ProxyPatternFlag => "proxyPatternFlagKey",
        }
    }

    /// Full store key for a discriminator.
    pub fn key(&self, discriminator: &str) -> String {
        format!("{}_{}", self.tag(), discriminator)
    }

    /// Key of a per-transaction list record.
    pub fn tx_key(&self, tx_hash: &B256) -> String {
        self.key(&tx_discriminator(tx_hash))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Canonical hex of a transaction hash: `0x` + 64 lowercase hex chars.
pub fn tx_discriminator(tx_hash: &B256) -> String {
    format!("0x{}", hex::encode(tx_hash))
}

/// Ordered `(proxy, implementation)` pair discriminator.
pub fn pair_discriminator(proxy: &Address, implementation: &Address) -> String {
    format!("0x{}_0x{}", hex::encode(proxy), hex::encode(implementation))
}

/// Key of the de-duplication flag for a proxy relationship.
pub fn proxy_flag_key(proxy: &Address, implementation: &Address) -> String {
    EventKind::ProxyPatternFlag.key(&pair_discriminator(proxy, implementation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_key_layout() {
        let hash = B256::repeat_byte(0xab);
        let key = EventKind::CreatedContract.tx_key(&hash);
        assert_eq!(key, format!("CreatedContractKey_0x{}", "ab".repeat(32)));
    }

    #[test]
    fn retired_tags_are_not_reused() {
        for kind in EventKind::ALL {
            assert!(!RETIRED_TAGS.contains(&kind.tag()), "{kind} reuses a retired tag");
        }
    }

    #[test]
    fn flag_key_is_ordered() {
        let p = Address::repeat_byte(0x01);
        let i = Address::repeat_byte(0x02);
        let forward = proxy_flag_key(&p, &i);
        assert_eq!(
            forward,
            format!("proxyPatternFlagKey_0x{}_0x{}", "01".repeat(20), "02".repeat(20))
        );
        assert_ne!(forward, proxy_flag_key(&i, &p));
    }
}
