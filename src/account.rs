// src/account.rs
use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::AbiEncode;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256};
use tracing::{debug, info};

use crate::chain::ChainReader;
use crate::contracts::{CreateAccountCall, ExecuteBatchCall, ExecuteCall};
use crate::error::OperationError;
use crate::types::{Call, UserOperation};

/// Signature-shaped placeholder accepted by ECDSA accounts during simulation.
const DUMMY_SIGNATURE: &str = "fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";

/// An already-authorized smart contract account.
#[async_trait]
pub trait SmartAccount: Send + Sync {
    fn address(&self) -> Address;

    async fn nonce(&self) -> Result<U256, OperationError>;

    /// Factory call deploying the account, or empty when it already exists.
    async fn init_code(&self) -> Result<Bytes, OperationError>;

    fn encode_calls(&self, calls: &[Call]) -> Result<Bytes, OperationError>;

    fn dummy_signature(&self) -> Bytes;

    async fn sign_user_operation(&self, user_op: &UserOperation) -> Result<Bytes, OperationError>;
}

/// eth-infinitism `SimpleAccount` owned by a local key.
pub struct SimpleAccount {
    owner: LocalWallet,
    address: Address,
    chain_id: u64,
    entry_point: Address,
    factory: Option<Address>,
    factory_salt: U256,
    chain: Arc<dyn ChainReader>,
}

impl SimpleAccount {
    pub fn new(
        owner: LocalWallet,
        address: Address,
        chain_id: u64,
        entry_point: Address,
        chain: Arc<dyn ChainReader>,
    ) -> Self {
        info!(
            "Smart account {:?} owned by {:?} on chain {}",
            address,
            owner.address(),
            chain_id
        );
        Self {
            owner: owner.with_chain_id(chain_id),
            address,
            chain_id,
            entry_point,
            factory: None,
            factory_salt: U256::zero(),
            chain,
        }
    }

    /// Lets a sponsored operation deploy the account through `factory` on first use.
    pub fn with_factory(mut self, factory: Address, salt: U256) -> Self {
        self.factory = Some(factory);
        self.factory_salt = salt;
        self
    }
}

#[async_trait]
impl SmartAccount for SimpleAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn nonce(&self) -> Result<U256, OperationError> {
        self.chain
            .entry_point_nonce(self.entry_point, self.address)
            .await
    }

    async fn init_code(&self) -> Result<Bytes, OperationError> {
        let Some(factory) = self.factory else {
            return Ok(Bytes::default());
        };
        if !self.chain.get_code(self.address).await?.is_empty() {
            return Ok(Bytes::default());
        }

        debug!("Account {:?} not deployed, attaching initCode", self.address);
        let create = CreateAccountCall {
            owner: self.owner.address(),
            salt: self.factory_salt,
        };
        let mut init_code = factory.as_bytes().to_vec();
        init_code.extend_from_slice(&create.encode());
        Ok(init_code.into())
    }

    fn encode_calls(&self, calls: &[Call]) -> Result<Bytes, OperationError> {
        encode_simple_account_calls(calls)
    }

    fn dummy_signature(&self) -> Bytes {
        hex::decode(DUMMY_SIGNATURE).unwrap_or_default().into()
    }

    async fn sign_user_operation(&self, user_op: &UserOperation) -> Result<Bytes, OperationError> {
        let hash = user_op.hash(self.entry_point, self.chain_id);
        let signature = self
            .owner
            .sign_message(hash.as_bytes())
            .await
            .map_err(|e| OperationError::Signer(e.to_string()))?;
        Ok(signature.to_vec().into())
    }
}

/// `execute` for one call, `executeBatch` for several.
fn encode_simple_account_calls(calls: &[Call]) -> Result<Bytes, OperationError> {
    match calls {
        [] => Err(OperationError::UnsupportedCall(
            "an operation needs at least one call".to_string(),
        )),
        [call] => Ok(ExecuteCall {
            dest: call.target(),
            value: call.value(),
            func: call.data(),
        }
        .encode()
        .into()),
        calls => {
            if calls.iter().any(|call| !call.value().is_zero()) {
                return Err(OperationError::UnsupportedCall(
                    "executeBatch cannot forward native value".to_string(),
                ));
            }
            Ok(ExecuteBatchCall {
                dest: calls.iter().map(Call::target).collect(),
                func: calls.iter().map(Call::data).collect(),
            }
            .encode()
            .into())
        }
    }
}

/// A deployed `SimpleAccount` known only by address. Good for gas estimation,
/// refuses to sign.
pub struct WatchedAccount {
    address: Address,
    entry_point: Address,
    chain: Arc<dyn ChainReader>,
}

impl WatchedAccount {
    pub fn new(address: Address, entry_point: Address, chain: Arc<dyn ChainReader>) -> Self {
        Self {
            address,
            entry_point,
            chain,
        }
    }
}

#[async_trait]
impl SmartAccount for WatchedAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn nonce(&self) -> Result<U256, OperationError> {
        self.chain
            .entry_point_nonce(self.entry_point, self.address)
            .await
    }

    async fn init_code(&self) -> Result<Bytes, OperationError> {
        Ok(Bytes::default())
    }

    fn encode_calls(&self, calls: &[Call]) -> Result<Bytes, OperationError> {
        encode_simple_account_calls(calls)
    }

    fn dummy_signature(&self) -> Bytes {
        hex::decode(DUMMY_SIGNATURE).unwrap_or_default().into()
    }

    async fn sign_user_operation(&self, _user_op: &UserOperation) -> Result<Bytes, OperationError> {
        Err(OperationError::Signer(format!(
            "no key held for watched account {:?}",
            self.address
        )))
    }
}

/// Unsigned operation for `call_data` carrying the account's placeholder signature.
pub async fn draft_user_operation(
    account: &dyn SmartAccount,
    call_data: Bytes,
) -> Result<UserOperation, OperationError> {
    Ok(UserOperation {
        sender: account.address(),
        nonce: account.nonce().await?,
        init_code: account.init_code().await?,
        call_data,
        signature: account.dummy_signature(),
        ..Default::default()
    })
}
