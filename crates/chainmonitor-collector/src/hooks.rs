//! Callbacks invoked by the execution engine.

use alloy_primitives::{Address, B256, U256};
use chainmonitor_evm::StorageReader;

/// Execution-time notifications.
///
/// Implementations must not fail the caller; anything that goes wrong is
/// handled internally.
pub trait ExecutionHooks: Send + Sync {
    /// A contract was deployed at `address` with runtime `code`.
    fn on_contract_created(&self, tx_hash: B256, address: Address, code: &[u8]);

    /// The contract at `address` self-destructed.
    fn on_contract_destroyed(&self, tx_hash: B256, address: Address);

    /// `caller` executed `DELEGATECALL` into `target`.
    fn on_delegate_call(
        &self,
        tx_hash: B256,
        caller: Address,
        caller_code: &[u8],
        target: Address,
        target_code: &[u8],
        storage: &dyn StorageReader,
    );

    /// Value moved from `from` to `to` inside contract execution.
    fn on_value_transfer(
        &self,
        block_number: u64,
        tx_hash: B256,
        from: Address,
        to: Address,
        amount: U256,
    );
}
