// src/chain.rs
use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{Address, Bytes, U256};

use crate::contracts::{EntryPoint, Erc20};
use crate::error::OperationError;

/// Read-only chain state used while building and checking operations.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_code(&self, address: Address) -> Result<Bytes, OperationError>;

    async fn get_balance(&self, address: Address) -> Result<U256, OperationError>;

    async fn erc20_decimals(&self, token: Address) -> Result<u8, OperationError>;

    /// Next nonce of `sender` in the default (zero) key space.
    async fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> Result<U256, OperationError>;
}

pub struct ProviderChainReader<M> {
    client: Arc<M>,
}

impl<M> ProviderChainReader<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for ProviderChainReader<M> {
    async fn get_code(&self, address: Address) -> Result<Bytes, OperationError> {
        self.client
            .get_code(address, None)
            .await
            .map_err(|e| OperationError::ChainRead(format!("getCode({address:?}): {e}")))
    }

    async fn get_balance(&self, address: Address) -> Result<U256, OperationError> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(|e| OperationError::ChainRead(format!("getBalance({address:?}): {e}")))
    }

    async fn erc20_decimals(&self, token: Address) -> Result<u8, OperationError> {
        Erc20::new(token, self.client.clone())
            .decimals()
            .call()
            .await
            .map_err(|e| OperationError::ChainRead(format!("decimals() on {token:?}: {e}")))
    }

    async fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> Result<U256, OperationError> {
        EntryPoint::new(entry_point, self.client.clone())
            .get_nonce(sender, U256::zero())
            .call()
            .await
            .map_err(|e| OperationError::ChainRead(format!("getNonce({sender:?}): {e}")))
    }
}
