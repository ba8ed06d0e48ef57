//! Value objects persisted by the monitor: contracts, proxy pairs, transfers.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Classified kind of a deployed contract.
///
/// Serialized as its numeric discriminant. Discriminant `3` was never
/// assigned and stays reserved so older records keep decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ContractType {
    /// Generic EVM bytecode, no recognized token standard.
    #[default]
    Evm = 1,
    /// Bytecode carrying the WASM magic bytes.
    Wasm = 2,
    Erc20 = 4,
    Erc721 = 5,
    Erc1155 = 6,
}

impl ContractType {
    /// `true` for the token standards (ERC-20 / ERC-721 / ERC-1155).
    pub fn is_token(&self) -> bool {
        matches!(self, Self::Erc20 | Self::Erc721 | Self::Erc1155)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::Wasm => "WASM",
            Self::Erc20 => "ERC20",
            Self::Erc721 => "ERC721",
            Self::Erc1155 => "ERC1155",
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ContractType> for u8 {
    fn from(t: ContractType) -> u8 {
        t as u8
    }
}

impl TryFrom<u8> for ContractType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Evm),
            2 => Ok(Self::Wasm),
            4 => Ok(Self::Erc20),
            5 => Ok(Self::Erc721),
            6 => Ok(Self::Erc1155),
            other => Err(format!("unknown contract type {other}")),
        }
    }
}

/// Optional interface extensions detected next to a token standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub erc721_metadata: bool,
    pub erc721_enumerable: bool,
    pub erc1155_metadata: bool,
}

/// Output of bytecode classification: a type plus its capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub contract_type: ContractType,
    pub capabilities: Capabilities,
}

impl Classification {
    pub fn new(contract_type: ContractType) -> Self {
        Self {
            contract_type,
            capabilities: Capabilities::default(),
        }
    }
}

/// Token metadata read from a contract through its view functions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One observed contract at one address.
///
/// Bytecode and its hex form are kept in memory only; the persisted JSON
/// carries the address, the numeric type and whatever flags/metadata apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub address: Address,
    #[serde(skip)]
    pub code: Vec<u8>,
    /// Lowercase hex of `code`, no `0x` prefix.
    #[serde(skip)]
    pub bin: String,
    pub contract_type: ContractType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_decimals: Option<u8>,
    #[serde(
        default,
        with = "crate::serde_number::option_u256_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub token_total_supply: Option<U256>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_support_erc721_metadata: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_support_erc721_enumerable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_support_erc1155_metadata: bool,
}

impl ContractInfo {
    /// Build from bytecode and an already computed classification.
    pub fn from_parts(address: Address, code: Vec<u8>, classification: Classification) -> Self {
        let bin = hex::encode(&code);
        let caps = classification.capabilities;
        Self {
            address,
            code,
            bin,
            contract_type: classification.contract_type,
            token_name: None,
            token_symbol: None,
            token_decimals: None,
            token_total_supply: None,
            is_support_erc721_metadata: caps.erc721_metadata,
            is_support_erc721_enumerable: caps.erc721_enumerable,
            is_support_erc1155_metadata: caps.erc1155_metadata,
        }
    }

    /// A record carrying only the address, as stored for self-destructed contracts.
    pub fn address_only(address: Address) -> Self {
        Self::from_parts(address, Vec::new(), Classification::default())
    }

    pub fn classification(&self) -> Classification {
        Classification {
            contract_type: self.contract_type,
            capabilities: Capabilities {
                erc721_metadata: self.is_support_erc721_metadata,
                erc721_enumerable: self.is_support_erc721_enumerable,
                erc1155_metadata: self.is_support_erc1155_metadata,
            },
        }
    }

    /// Attach token metadata. Empty strings are left unset.
    pub fn with_token_metadata(mut self, meta: TokenMetadata) -> Self {
        self.token_name = Some(meta.name).filter(|s| !s.is_empty());
        self.token_symbol = Some(meta.symbol).filter(|s| !s.is_empty());
        self.token_decimals = Some(meta.decimals).filter(|d| *d != 0);
        self.token_total_supply = Some(meta.total_supply).filter(|s| !s.is_zero());
        self
    }
}

/// A proxy → implementation relationship discovered at a delegate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyPattern {
    pub proxy: ContractInfo,
    pub implementation: ContractInfo,
}

/// A value transfer performed inside contract execution (not the outer tx value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTransfer {
    pub tx_hash: B256,
    pub from: Address,
    pub to: Address,
    #[serde(with = "crate::serde_number::u256_number")]
    pub amount: U256,
}
