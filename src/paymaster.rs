// src/paymaster.rs
use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::types::Bytes;
use tracing::{debug, error, info};

use crate::error::OperationError;
use crate::types::{PaymasterResponse, UserOperation};

/// Covers gas on behalf of the account by returning `paymasterAndData`.
#[async_trait]
pub trait Sponsor: Send + Sync {
    async fn sponsor(&self, user_op: &UserOperation) -> Result<Bytes, OperationError>;
}

/// Client for a paymaster service exposing `pm_sponsorUserOperation`.
pub struct PaymasterClient {
    client: Provider<Http>,
}

impl PaymasterClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = Provider::<Http>::try_from(url)?;
        info!("Using paymaster service at {}", url);
        Ok(Self { client })
    }
}

#[async_trait]
impl Sponsor for PaymasterClient {
    async fn sponsor(&self, user_op: &UserOperation) -> Result<Bytes, OperationError> {
        debug!("Requesting sponsorship for sender: {:?}", user_op.sender);

        let response: PaymasterResponse = self
            .client
            .request("pm_sponsorUserOperation", [user_op])
            .await
            .map_err(|e| {
                error!("Paymaster refused operation for {:?}: {}", user_op.sender, e);
                OperationError::execution_failed(format!("paymaster sponsorship failed: {e}"))
            })?;

        Ok(response.paymaster_and_data)
    }
}
