//! Bytecode classification by selector presence.
//!
//! A signature counts as implemented when its trimmed selector hex appears
//! anywhere in the bytecode hex. This is a heuristic over an untrusted blob,
//! not a disassembly: the dispatcher's PUSH4 immediates are what usually match.
//!
//! Order of checks:
//! 1. all ERC-20 selectors → `ERC20`
//! 2. ERC-165 marker + all ERC-721 selectors → `ERC721` (+ metadata / enumerable)
//! 3. ERC-165 marker + all ERC-1155 selectors → `ERC1155` (+ metadata)
//! 4. WASM magic `0061736d` → `WASM`
//! 5. otherwise `EVM`

use alloy_primitives::Address;
use chainmonitor_core::types::{Capabilities, Classification, ContractInfo, ContractType};

use crate::selector::trimmed_selector_hex;

/// WASM module magic (`\0asm`) as hex.
pub const WASM_MAGIC_HEX: &str = "0061736d";

pub const ERC165_SIGNATURE: &str = "supportsInterface(bytes4)";

pub const ERC20_SIGNATURES: [&str; 6] = [
    "totalSupply()",
    "balanceOf(address)",
    "transfer(address,uint256)",
    "transferFrom(address,address,uint256)",
    "approve(address,uint256)",
    "allowance(address,address)",
];

pub const ERC721_SIGNATURES: [&str; 9] = [
    "balanceOf(address)",
    "ownerOf(uint256)",
    "approve(address,uint256)",
    "getApproved(uint256)",
    "setApprovalForAll(address,bool)",
    "isApprovedForAll(address,address)",
    "transferFrom(address,address,uint256)",
    "safeTransferFrom(address,address,uint256)",
    "safeTransferFrom(address,address,uint256,bytes)",
];

pub const ERC721_METADATA_SIGNATURES: [&str; 3] = ["name()", "symbol()", "tokenURI(uint256)"];

pub const ERC721_ENUMERABLE_SIGNATURES: [&str; 3] = [
    "totalSupply()",
    "tokenByIndex(uint256)",
    "tokenOfOwnerByIndex(address,uint256)",
];

pub const ERC1155_SIGNATURES: [&str; 6] = [
    "safeTransferFrom(address,address,uint256,uint256,bytes)",
    "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
    "balanceOf(address,uint256)",
    "balanceOfBatch(address[],uint256[])",
    "setApprovalForAll(address,bool)",
    "isApprovedForAll(address,address)",
];

pub const ERC1155_METADATA_SIGNATURE: &str = "uri(uint256)";

/// Decides whether bytecode implements a function signature.
///
/// The default [`SubstringMatcher`] searches the hex blob; a disassembly-based
/// matcher can be plugged into [`Classifier`] without touching callers.
pub trait SignatureMatcher: Send + Sync {
    fn implements(&self, bin_hex: &str, signature: &str) -> bool;
}

/// Naive substring search for the trimmed selector hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl SignatureMatcher for SubstringMatcher {
    fn implements(&self, bin_hex: &str, signature: &str) -> bool {
        implements_signature(bin_hex, signature)
    }
}

/// `true` if the trimmed selector of `signature` occurs in `bin_hex`.
pub fn implements_signature(bin_hex: &str, signature: &str) -> bool {
    bin_hex.contains(&trimmed_selector_hex(signature))
}

/// Bytecode classifier parameterized by its matching strategy.
#[derive(Debug, Clone, Default)]
pub struct Classifier<M = SubstringMatcher> {
    matcher: M,
}

impl Classifier<SubstringMatcher> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: SignatureMatcher> Classifier<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn implements(&self, bin_hex: &str, signature: &str) -> bool {
        self.matcher.implements(bin_hex, signature)
    }

    /// Every signature must match; a partial match is not enough.
    pub fn implements_all(&self, bin_hex: &str, signatures: &[&str]) -> bool {
        signatures.iter().all(|sig| self.implements(bin_hex, sig))
    }

    /// Classify raw bytecode. Empty code (an EOA) is the neutral default.
    pub fn classify(&self, code: &[u8]) -> Classification {
        if code.is_empty() {
            return Classification::default();
        }
        self.classify_hex(&hex::encode(code))
    }

    /// Classify bytecode that is already lowercase hex without `0x`.
    pub fn classify_hex(&self, bin_hex: &str) -> Classification {
        if bin_hex.is_empty() {
            return Classification::default();
        }

        if self.implements_all(bin_hex, &ERC20_SIGNATURES) {
            return Classification::new(ContractType::Erc20);
        }

        if self.implements(bin_hex, ERC165_SIGNATURE) {
            if self.implements_all(bin_hex, &ERC721_SIGNATURES) {
                return Classification {
                    contract_type: ContractType::Erc721,
                    capabilities: Capabilities {
                        erc721_metadata: self.implements_all(bin_hex, &ERC721_METADATA_SIGNATURES),
                        erc721_enumerable: self
                            .implements_all(bin_hex, &ERC721_ENUMERABLE_SIGNATURES),
                        ..Capabilities::default()
                    },
                };
            }
            if self.implements_all(bin_hex, &ERC1155_SIGNATURES) {
                return Classification {
                    contract_type: ContractType::Erc1155,
                    capabilities: Capabilities {
                        erc1155_metadata: self.implements(bin_hex, ERC1155_METADATA_SIGNATURE),
                        ..Capabilities::default()
                    },
                };
            }
        }

        if bin_hex.contains(WASM_MAGIC_HEX) {
            return Classification::new(ContractType::Wasm);
        }

        Classification::new(ContractType::Evm)
    }

    /// Build a [`ContractInfo`] for one observed contract.
    pub fn inspect(&self, address: Address, code: &[u8]) -> ContractInfo {
        let classification = self.classify(code);
        ContractInfo::from_parts(address, code.to_vec(), classification)
    }
}

/// Classify with the default substring matcher.
pub fn classify(code: &[u8]) -> Classification {
    Classifier::new().classify(code)
}

/// Build a [`ContractInfo`] with the default substring matcher.
pub fn inspect(address: Address, code: &[u8]) -> ContractInfo {
    Classifier::new().inspect(address, code)
}
