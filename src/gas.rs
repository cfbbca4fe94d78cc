// src/gas.rs
use std::sync::Arc;

use ethers::types::{Address, U256};
use tracing::{debug, error, info, warn};

use crate::account::{draft_user_operation, SmartAccount};
use crate::bundler::BundlerClient;
use crate::diagnostics::{DiagnosticReport, DiagnosticsSink};
use crate::error::OperationError;
use crate::oracle::GasPriceOracle;
use crate::types::{GasEstimate, GasParameters, GasPrice, GasTarget};

/// Combines price and estimate, replacing the estimated verification gas with `verification_gas_floor`.
///
/// Bundlers report zero (or too little) verification gas for accounts whose
/// simulation failed, which later surfaces as AA23; the floor is applied regardless.
pub fn merge_gas_parameters(
    price: GasPrice,
    estimate: GasEstimate,
    verification_gas_floor: u64,
) -> GasParameters {
    GasParameters {
        max_fee_per_gas: price.max_fee_per_gas,
        max_priority_fee_per_gas: price.max_priority_fee_per_gas,
        call_gas_limit: estimate.call_gas_limit,
        verification_gas_limit: U256::from(verification_gas_floor),
        pre_verification_gas: estimate.pre_verification_gas,
    }
}

pub struct GasResolver {
    chain_id: u64,
    entry_point: Address,
    verification_gas_floor: u64,
    oracle: Arc<dyn GasPriceOracle>,
    bundler: Arc<dyn BundlerClient>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl GasResolver {
    pub fn new(
        chain_id: u64,
        entry_point: Address,
        verification_gas_floor: u64,
        oracle: Arc<dyn GasPriceOracle>,
        bundler: Arc<dyn BundlerClient>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            chain_id,
            entry_point,
            verification_gas_floor,
            oracle,
            bundler,
            diagnostics,
        }
    }

    /// Fresh gas fields for one operation attempt.
    pub async fn resolve(
        &self,
        account: &dyn SmartAccount,
        target: &GasTarget,
    ) -> Result<GasParameters, OperationError> {
        let price = self.oracle.user_operation_gas_price(self.chain_id).await?;
        info!(
            "Gas price: maxFeePerGas={} maxPriorityFeePerGas={}",
            price.max_fee_per_gas, price.max_priority_fee_per_gas
        );

        let call_data = match target {
            GasTarget::Calls(calls) => account.encode_calls(calls)?,
            GasTarget::CallData(call_data) => call_data.clone(),
        };
        let mut draft = draft_user_operation(account, call_data).await?;
        draft.max_fee_per_gas = price.max_fee_per_gas;
        draft.max_priority_fee_per_gas = price.max_priority_fee_per_gas;

        let estimate = self
            .bundler
            .estimate_user_operation_gas(&draft, self.entry_point)
            .await
            .map_err(|e| {
                error!("Gas estimate failed for {:?}: {}", draft.sender, e);
                OperationError::GasEstimationFailed(e.to_string())
            })?;
        debug!("Bundler estimate: {:?}", estimate);

        let message = if estimate.verification_gas_limit.is_zero() {
            warn!(
                "Bundler returned verificationGasLimit=0 for {:?}, simulation likely failed",
                draft.sender
            );
            "verificationGasLimit is 0"
        } else {
            "resolved gas parameters"
        };

        let gas = merge_gas_parameters(price, estimate, self.verification_gas_floor);
        info!("Gas parameters for {:?}: {:?}", draft.sender, gas);

        self.diagnostics.report(DiagnosticReport {
            message: message.to_string(),
            chain_id: self.chain_id,
            wallet_address: account.address(),
            info: gas,
        });

        Ok(gas)
    }
}
