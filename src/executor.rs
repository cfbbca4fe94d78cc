// src/executor.rs
use std::sync::Arc;
use std::time::Duration;

use ethers::types::{Address, H256};
use tracing::{debug, error, info};

use crate::account::{draft_user_operation, SmartAccount};
use crate::bundler::BundlerClient;
use crate::error::OperationError;
use crate::paymaster::Sponsor;
use crate::types::{UserOperationReceipt, UserOperationRequest};

/// Submits one operation and waits for its receipt. Nothing is retried: a
/// failed request is dropped and the caller builds a new one.
pub struct Executor {
    chain_id: u64,
    entry_point: Address,
    bundler: Arc<dyn BundlerClient>,
    sponsor: Option<Arc<dyn Sponsor>>,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl Executor {
    pub fn new(
        chain_id: u64,
        entry_point: Address,
        bundler: Arc<dyn BundlerClient>,
        sponsor: Option<Arc<dyn Sponsor>>,
        receipt_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain_id,
            entry_point,
            bundler,
            sponsor,
            receipt_timeout,
            poll_interval,
        }
    }

    pub async fn execute(
        &self,
        account: &dyn SmartAccount,
        request: UserOperationRequest,
    ) -> Result<UserOperationReceipt, OperationError> {
        let call_data = account.encode_calls(&[request.payload])?;
        let mut user_op = draft_user_operation(account, call_data)
            .await?
            .with_gas(&request.gas);

        if request.sponsor {
            let sponsor = self
                .sponsor
                .as_ref()
                .ok_or(OperationError::SponsorshipUnavailable {
                    chain_id: self.chain_id,
                })?;
            user_op.paymaster_and_data = sponsor.sponsor(&user_op).await?;
        }
        user_op.signature = account.sign_user_operation(&user_op).await?;
        debug!("Built user operation for {:?}: {:?}", user_op.sender, user_op);

        let user_op_hash = self
            .bundler
            .send_user_operation(&user_op, self.entry_point)
            .await
            .map_err(|e| {
                error!("User operation submission failed: {}", e);
                OperationError::execution_failed(e.to_string())
            })?;
        info!("Submitted user operation {:?}", user_op_hash);

        let receipt = self.wait_for_receipt(user_op_hash).await?;
        info!(
            "User operation {:?} included in tx {:?}, success={}",
            user_op_hash,
            receipt.transaction_hash(),
            receipt.success
        );
        Ok(receipt)
    }

    /// Polls until the bundler reports a receipt or `receipt_timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        user_op_hash: H256,
    ) -> Result<UserOperationReceipt, OperationError> {
        let poll = async {
            loop {
                match self.bundler.get_user_operation_receipt(user_op_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => tokio::time::sleep(self.poll_interval).await,
                    Err(e) => {
                        error!("Receipt lookup for {:?} failed: {}", user_op_hash, e);
                        return Err(OperationError::execution_failed(e.to_string()));
                    }
                }
            }
        };

        tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| OperationError::ReceiptTimeout {
                user_op_hash,
                timeout: self.receipt_timeout,
            })?
    }
}
