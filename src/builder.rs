// src/builder.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ethers::abi::AbiEncode;
use ethers::types::{Address, H256, U256};
use tracing::debug;

use crate::chain::ChainReader;
use crate::config::ChainContracts;
use crate::contracts::{CreateMinimalCall, PerformCreate2Call};
use crate::error::OperationError;
use crate::types::{Call, DeploymentSpec, TokenDeploymentSpec, TransferIntent};

const NATIVE_DECIMALS: u32 = 18;

/// Converts a human readable decimal amount to base units.
///
/// Fractional digits beyond `decimals` are truncated, never rounded. The
/// conversion is done on the decimal string, so large amounts keep full precision.
pub fn parse_units_truncated(amount: &str, decimals: u32) -> Result<U256, OperationError> {
    let invalid = || OperationError::InvalidAmount(format!("{amount:?}"));

    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let decimals = decimals as usize;
    let kept = &fraction[..fraction.len().min(decimals)];
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(decimals - kept.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| invalid())
}

/// Deployment salts: 24 random bytes followed by a per-process counter.
#[derive(Debug, Default)]
pub struct SaltGenerator {
    counter: AtomicU64,
}

impl SaltGenerator {
    pub fn next_salt(&self) -> H256 {
        let mut salt = [0u8; 32];
        salt[..24].copy_from_slice(&rand::random::<[u8; 24]>());
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        salt[24..].copy_from_slice(&count.to_be_bytes());
        H256(salt)
    }
}

/// Turns intents into the single call an operation executes.
pub struct OperationBuilder {
    chain_id: u64,
    contracts: ChainContracts,
    chain: Arc<dyn ChainReader>,
    salts: SaltGenerator,
}

impl OperationBuilder {
    pub fn new(chain_id: u64, contracts: ChainContracts, chain: Arc<dyn ChainReader>) -> Self {
        Self {
            chain_id,
            contracts,
            chain,
            salts: SaltGenerator::default(),
        }
    }

    /// Native transfer when the intent has no token (or the zero address), ERC-20 otherwise.
    pub async fn transfer(&self, intent: &TransferIntent) -> Result<Call, OperationError> {
        match intent.token {
            Some(token) if token != Address::zero() => self.erc20_transfer(intent, token).await,
            _ => self.native_transfer(intent),
        }
    }

    pub fn native_transfer(&self, intent: &TransferIntent) -> Result<Call, OperationError> {
        Ok(Call::NativeTransfer {
            to: intent.recipient,
            value: parse_units_truncated(&intent.amount, NATIVE_DECIMALS)?,
        })
    }

    pub async fn erc20_transfer(
        &self,
        intent: &TransferIntent,
        token: Address,
    ) -> Result<Call, OperationError> {
        let decimals = self.chain.erc20_decimals(token).await?;
        let amount = parse_units_truncated(&intent.amount, decimals.into())?;
        debug!(
            "ERC-20 transfer of {} ({} base units, {} decimals) on {:?}",
            intent.amount, amount, decimals, token
        );
        Ok(Call::Erc20Transfer {
            token,
            to: intent.recipient,
            amount,
        })
    }

    pub fn deployment(&self, spec: &DeploymentSpec) -> Result<Call, OperationError> {
        let create_call = self
            .contracts
            .create_call
            .ok_or(OperationError::CreateCallNotConfigured {
                chain_id: self.chain_id,
            })?;
        let salt = spec.salt.unwrap_or_else(|| self.salts.next_salt());
        debug!("CREATE2 deployment through {:?} with salt {:?}", create_call, salt);

        let data = PerformCreate2Call {
            value: spec.value,
            deployment_data: spec.init_code.clone(),
            salt: salt.0,
        }
        .encode();
        Ok(Call::ContractCall {
            to: create_call,
            value: spec.value,
            data: data.into(),
        })
    }

    pub fn token_deployment(&self, spec: &TokenDeploymentSpec) -> Result<Call, OperationError> {
        let factory = self
            .contracts
            .token_factory
            .ok_or(OperationError::FactoryNotConfigured {
                chain_id: self.chain_id,
            })?;

        let init_mint = match spec.init_mint.as_deref() {
            Some(init_mint) => parse_units_truncated(init_mint, 0)?,
            None => U256::zero(),
        };
        let data = CreateMinimalCall {
            name: spec.name.clone(),
            symbol: spec.symbol.clone(),
            owner: spec.owner,
            minter: spec.minter,
            init_mint,
            max_supply: parse_units_truncated(&spec.max_supply, 0)?,
        }
        .encode();
        Ok(Call::ContractCall {
            to: factory,
            value: U256::zero(),
            data: data.into(),
        })
    }
}
