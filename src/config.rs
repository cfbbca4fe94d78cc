// src/config.rs
use std::time::Duration;

use ethers::types::Address;

/// Contracts an operation may call on one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainContracts {
    pub create_call: Option<Address>,
    pub token_factory: Option<Address>,
    pub account_factory: Option<Address>,
}

/// The resolved network an orchestrator is bound to.
#[derive(Debug, Clone)]
pub struct ChainContext {
    pub chain_id: u64,
    pub rpc_url: String,
    pub bundler_url: String,
    pub gas_price_url: String,
    pub paymaster_url: Option<String>,
    pub diagnostics_url: Option<String>,
    pub entry_point: Address,
    pub contracts: ChainContracts,
}

/// Empirical gas constants. Not protocol values; tune per chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Replaces whatever verificationGasLimit the bundler estimated.
    pub verification_gas_floor: u64,
    /// Extra gas added to the prefund ceiling.
    pub prefund_cushion: u64,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            verification_gas_floor: 600_000,
            prefund_cushion: 50_000,
            receipt_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}
