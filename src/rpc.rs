// src/rpc.rs
use std::sync::Arc;

use ethers::types::{Address, Bytes};
use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::error::ErrorObjectOwned;
use tracing::{debug, error, info};

use crate::error::OperationError;
use crate::orchestrator::Orchestrator;
use crate::types::{
    DeploymentSpec, GasParameters, TokenDeploymentSpec, TransferIntent, UserOperationReceipt,
};

const OPERATION_ERROR_CODE: i32 = -32000;

#[rpc(server, namespace = "courier")]
pub trait CourierRpc {
    /// Address of the smart account operations are sent from
    #[method(name = "accountAddress")]
    async fn account_address(&self) -> RpcResult<Address>;

    /// Sends native currency and waits for inclusion
    #[method(name = "transfer")]
    async fn transfer(&self, intent: TransferIntent) -> RpcResult<UserOperationReceipt>;

    /// Sends an ERC-20 token and waits for inclusion
    #[method(name = "transferErc20")]
    async fn transfer_erc20(&self, intent: TransferIntent) -> RpcResult<UserOperationReceipt>;

    /// Gas for a transfer, optionally from another deployed account
    #[method(name = "estimateTransfer")]
    async fn estimate_transfer(
        &self,
        intent: TransferIntent,
        account: Option<Address>,
    ) -> RpcResult<GasParameters>;

    #[method(name = "estimateCallData")]
    async fn estimate_call_data(&self, call_data: Bytes) -> RpcResult<GasParameters>;

    /// Deploys arbitrary init code through CREATE2
    #[method(name = "deploy")]
    async fn deploy(&self, spec: DeploymentSpec) -> RpcResult<UserOperationReceipt>;

    #[method(name = "deployToken")]
    async fn deploy_token(&self, spec: TokenDeploymentSpec) -> RpcResult<UserOperationReceipt>;
}

pub struct CourierRpcImpl {
    orchestrator: Arc<Orchestrator>,
}

impl CourierRpcImpl {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

fn to_rpc_error(method: &str, err: OperationError) -> ErrorObjectOwned {
    error!("{} failed: {}", method, err);
    ErrorObjectOwned::owned(
        OPERATION_ERROR_CODE,
        format!("Courier error: {}", err),
        None::<()>,
    )
}

fn log_receipt(method: &str, receipt: &UserOperationReceipt) {
    info!(
        "{}: user operation {:?} landed in {:?}, success={}",
        method,
        receipt.user_op_hash,
        receipt.transaction_hash(),
        receipt.success
    );
}

#[async_trait]
impl CourierRpcServer for CourierRpcImpl {
    async fn account_address(&self) -> RpcResult<Address> {
        Ok(self.orchestrator.account_address())
    }

    async fn transfer(&self, intent: TransferIntent) -> RpcResult<UserOperationReceipt> {
        debug!("Received transfer of {} to {:?}", intent.amount, intent.recipient);
        let receipt = self
            .orchestrator
            .transfer(&intent)
            .await
            .map_err(|e| to_rpc_error("transfer", e))?;
        log_receipt("transfer", &receipt);
        Ok(receipt)
    }

    async fn transfer_erc20(&self, intent: TransferIntent) -> RpcResult<UserOperationReceipt> {
        debug!(
            "Received ERC-20 transfer of {} {:?} to {:?}",
            intent.amount, intent.token, intent.recipient
        );
        let receipt = self
            .orchestrator
            .transfer_erc20(&intent)
            .await
            .map_err(|e| to_rpc_error("transferErc20", e))?;
        log_receipt("transferErc20", &receipt);
        Ok(receipt)
    }

    async fn estimate_transfer(
        &self,
        intent: TransferIntent,
        account: Option<Address>,
    ) -> RpcResult<GasParameters> {
        self.orchestrator
            .estimate_transfer(&intent, account)
            .await
            .map_err(|e| to_rpc_error("estimateTransfer", e))
    }

    async fn estimate_call_data(&self, call_data: Bytes) -> RpcResult<GasParameters> {
        self.orchestrator
            .estimate_call_data(call_data)
            .await
            .map_err(|e| to_rpc_error("estimateCallData", e))
    }

    async fn deploy(&self, spec: DeploymentSpec) -> RpcResult<UserOperationReceipt> {
        debug!("Received CREATE2 deployment of {} bytes", spec.init_code.len());
        let receipt = self
            .orchestrator
            .deploy(&spec)
            .await
            .map_err(|e| to_rpc_error("deploy", e))?;
        log_receipt("deploy", &receipt);
        Ok(receipt)
    }

    async fn deploy_token(&self, spec: TokenDeploymentSpec) -> RpcResult<UserOperationReceipt> {
        debug!("Received token deployment {} ({})", spec.name, spec.symbol);
        let receipt = self
            .orchestrator
            .deploy_token(&spec)
            .await
            .map_err(|e| to_rpc_error("deployToken", e))?;
        log_receipt("deployToken", &receipt);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_errors_map_to_server_error_code() {
        let err = to_rpc_error("deployToken", OperationError::FactoryNotConfigured { chain_id: 10 });
        assert_eq!(err.code(), OPERATION_ERROR_CODE);
        assert_eq!(
            err.message(),
            "Courier error: Token factory contract not configured for chain 10"
        );
    }
}
