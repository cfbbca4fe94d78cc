// src/preflight.rs
//! Checks that run before anything is sent to the bundler.
//! Both are skipped for sponsored operations.
use ethers::types::{Address, U256};
use tracing::debug;

use crate::chain::ChainReader;
use crate::error::OperationError;
use crate::types::GasParameters;

/// Upper bound of what the entry point may charge the account, or `None` when the fee is unknown.
pub fn prefund_ceiling(gas: &GasParameters, cushion: u64) -> Option<U256> {
    if gas.max_fee_per_gas.is_zero() {
        return None;
    }
    let total_gas = gas
        .call_gas_limit
        .saturating_add(gas.verification_gas_limit)
        .saturating_add(gas.pre_verification_gas)
        .saturating_add(U256::from(cushion));
    Some(total_gas.saturating_mul(gas.max_fee_per_gas))
}

/// A sponsored operation may deploy the account through its initCode, so only
/// unsponsored ones need existing bytecode.
pub async fn assert_account_deployed(
    chain: &dyn ChainReader,
    account: Address,
    chain_id: u64,
    sponsor: bool,
) -> Result<(), OperationError> {
    if sponsor {
        return Ok(());
    }

    let code = chain.get_code(account).await?;
    if code.is_empty() {
        return Err(OperationError::AccountNotDeployed { account, chain_id });
    }
    Ok(())
}

pub async fn assert_can_prefund(
    chain: &dyn ChainReader,
    account: Address,
    gas: &GasParameters,
    cushion: u64,
    sponsor: bool,
) -> Result<(), OperationError> {
    if sponsor {
        return Ok(());
    }

    let balance = chain.get_balance(account).await?;
    match prefund_ceiling(gas, cushion) {
        Some(required) if balance < required => Err(OperationError::InsufficientPrefund {
            account,
            balance,
            required,
        }),
        Some(required) => {
            debug!("Prefund ok for {:?}: balance={} needed<={}", account, balance, required);
            Ok(())
        }
        None if balance.is_zero() => Err(OperationError::InsufficientPrefund {
            account,
            balance,
            required: U256::zero(),
        }),
        None => Ok(()),
    }
}
