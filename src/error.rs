// src/error.rs
use std::time::Duration;

use ethers::types::{Address, H256, U256};
use thiserror::Error;

/// Appended to execution failures whose message carries an account validation revert.
pub const VALIDATION_REVERT_HINT: &str = " (AA23: account validateUserOp reverted. Common causes: wrong owner/key, wrong chain/account address, nonce mismatch, or no paymaster + insufficient ETH to prefund.)";

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Failed to get gas price: {0}")]
    GasPriceUnavailable(String),

    #[error("Failed to estimate user operation gas: {0}")]
    GasEstimationFailed(String),

    #[error("Smart account {account:?} has no bytecode on chain {chain_id}. Either it's not deployed on this chain, or you're signing for a different address/chain.")]
    AccountNotDeployed { account: Address, chain_id: u64 },

    #[error("Insufficient funds to prefund gas for this UserOperation on account {account:?}: balance={balance} wei, estimated needed={required} wei. Top up the smart account or enable gas sponsorship.")]
    InsufficientPrefund {
        account: Address,
        balance: U256,
        required: U256,
    },

    #[error("Token factory contract not configured for chain {chain_id}")]
    FactoryNotConfigured { chain_id: u64 },

    #[error("CreateCall contract not configured for chain {chain_id}")]
    CreateCallNotConfigured { chain_id: u64 },

    #[error("Gas sponsorship requested but no paymaster is configured for chain {chain_id}")]
    SponsorshipUnavailable { chain_id: u64 },

    #[error("Failed to execute user operation: {message}{}", .hint.as_deref().unwrap_or(""))]
    UserOperationExecutionFailed {
        message: String,
        hint: Option<String>,
    },

    #[error("Timed out after {timeout:?} waiting for receipt of user operation {user_op_hash:?}; it may still be included later")]
    ReceiptTimeout { user_op_hash: H256, timeout: Duration },

    #[error("ERC20 token address is required")]
    MissingTokenAddress,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported call: {0}")]
    UnsupportedCall(String),

    #[error("Chain read failed: {0}")]
    ChainRead(String),

    #[error("Signer error: {0}")]
    Signer(String),
}

impl OperationError {
    /// Wraps a submission or receipt-wait failure, attaching the validation hint when it applies.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = if message.contains("AA23") || message.contains("validateUserOp") {
            Some(VALIDATION_REVERT_HINT.to_string())
        } else {
            None
        };
        OperationError::UserOperationExecutionFailed { message, hint }
    }
}
