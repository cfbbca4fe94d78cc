// src/bundler.rs
use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError};
use ethers::types::{Address, H256};
use tracing::debug;

use crate::types::{GasEstimate, UserOperation, UserOperationReceipt};

/// The bundler RPC methods an operation goes through.
#[async_trait]
pub trait BundlerClient: Send + Sync {
    async fn estimate_user_operation_gas(
        &self,
        user_op: &UserOperation,
        entry_point: Address,
    ) -> Result<GasEstimate, ProviderError>;

    async fn send_user_operation(
        &self,
        user_op: &UserOperation,
        entry_point: Address,
    ) -> Result<H256, ProviderError>;

    /// `None` until the operation is included.
    async fn get_user_operation_receipt(
        &self,
        user_op_hash: H256,
    ) -> Result<Option<UserOperationReceipt>, ProviderError>;
}

pub struct HttpBundler {
    client: Provider<Http>,
}

impl HttpBundler {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: Provider::<Http>::try_from(url)?,
        })
    }
}

#[async_trait]
impl BundlerClient for HttpBundler {
    async fn estimate_user_operation_gas(
        &self,
        user_op: &UserOperation,
        entry_point: Address,
    ) -> Result<GasEstimate, ProviderError> {
        debug!("eth_estimateUserOperationGas for sender {:?}", user_op.sender);
        self.client
            .request("eth_estimateUserOperationGas", (user_op, entry_point))
            .await
    }

    async fn send_user_operation(
        &self,
        user_op: &UserOperation,
        entry_point: Address,
    ) -> Result<H256, ProviderError> {
        debug!("eth_sendUserOperation for sender {:?}", user_op.sender);
        self.client
            .request("eth_sendUserOperation", (user_op, entry_point))
            .await
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: H256,
    ) -> Result<Option<UserOperationReceipt>, ProviderError> {
        self.client
            .request("eth_getUserOperationReceipt", [user_op_hash])
            .await
    }
}
