//! # chainmonitor-evm
//!
//! Bytecode inspection for the monitor.
//!
//! ## Implementation notes
//! - Selectors are `keccak256(signature)[..4]` via `tiny-keccak`
//! - Classification searches the bytecode hex for trimmed selectors
//! - Proxy detection looks for EIP-1967 / zeppelinos slot pairs and confirms
//!   against the caller's storage
//! - Token metadata is decoded from raw view-call output

pub mod classifier;
pub mod proxy;
pub mod selector;
pub mod slots;
pub mod token;

pub use classifier::{classify, implements_signature, inspect, Classifier, SignatureMatcher, SubstringMatcher};
pub use proxy::{detect_proxy, storage_to_address, ProxyDetector, StorageReader};
pub use selector::{keccak256, selector, selector_hex, trimmed_selector_hex};
pub use slots::{ProxyConvention, SlotPair};
pub use token::{read_token_metadata, ContractCaller};
