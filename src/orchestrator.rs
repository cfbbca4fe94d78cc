// src/orchestrator.rs
use std::sync::Arc;

use ethers::providers::{Http, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, U256};
use tracing::info;

use crate::account::{SimpleAccount, SmartAccount, WatchedAccount};
use crate::builder::OperationBuilder;
use crate::bundler::{BundlerClient, HttpBundler};
use crate::chain::{ChainReader, ProviderChainReader};
use crate::config::{ChainContext, Tuning};
use crate::diagnostics::{DiagnosticsSink, HttpDiagnostics, NoopDiagnostics};
use crate::error::OperationError;
use crate::executor::Executor;
use crate::gas::GasResolver;
use crate::oracle::{GasPriceOracle, PimlicoGasOracle};
use crate::paymaster::{PaymasterClient, Sponsor};
use crate::preflight;
use crate::types::{
    Call, DeploymentSpec, GasParameters, GasTarget, TokenDeploymentSpec, TransferIntent,
    UserOperationReceipt, UserOperationRequest,
};

/// External services an orchestrator talks to.
pub struct Capabilities {
    pub account: Arc<dyn SmartAccount>,
    pub chain: Arc<dyn ChainReader>,
    pub oracle: Arc<dyn GasPriceOracle>,
    pub bundler: Arc<dyn BundlerClient>,
    pub sponsor: Option<Arc<dyn Sponsor>>,
    pub diagnostics: Arc<dyn DiagnosticsSink>,
}

/// Entry points turning intents into included user operations on one chain.
pub struct Orchestrator {
    context: ChainContext,
    tuning: Tuning,
    account: Arc<dyn SmartAccount>,
    chain: Arc<dyn ChainReader>,
    builder: OperationBuilder,
    resolver: GasResolver,
    executor: Executor,
}

impl Orchestrator {
    pub fn new(context: ChainContext, tuning: Tuning, capabilities: Capabilities) -> Self {
        let builder = OperationBuilder::new(
            context.chain_id,
            context.contracts.clone(),
            capabilities.chain.clone(),
        );
        let resolver = GasResolver::new(
            context.chain_id,
            context.entry_point,
            tuning.verification_gas_floor,
            capabilities.oracle,
            capabilities.bundler.clone(),
            capabilities.diagnostics,
        );
        let executor = Executor::new(
            context.chain_id,
            context.entry_point,
            capabilities.bundler,
            capabilities.sponsor,
            tuning.receipt_timeout,
            tuning.receipt_poll_interval,
        );

        Self {
            context,
            tuning,
            account: capabilities.account,
            chain: capabilities.chain,
            builder,
            resolver,
            executor,
        }
    }

    /// Wires HTTP clients for every endpoint in `context`.
    pub fn connect(
        context: ChainContext,
        tuning: Tuning,
        owner: LocalWallet,
        account_address: Address,
    ) -> anyhow::Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(context.rpc_url.as_str())?);
        let chain: Arc<dyn ChainReader> = Arc::new(ProviderChainReader::new(provider));

        let mut account = SimpleAccount::new(
            owner,
            account_address,
            context.chain_id,
            context.entry_point,
            chain.clone(),
        );
        if let Some(factory) = context.contracts.account_factory {
            account = account.with_factory(factory, U256::zero());
        }

        let sponsor: Option<Arc<dyn Sponsor>> = match context.paymaster_url.as_deref() {
            Some(url) => Some(Arc::new(PaymasterClient::new(url)?)),
            None => None,
        };
        let diagnostics: Arc<dyn DiagnosticsSink> = match context.diagnostics_url.as_deref() {
            Some(url) => Arc::new(HttpDiagnostics::new(url)),
            None => Arc::new(NoopDiagnostics),
        };

        let capabilities = Capabilities {
            account: Arc::new(account),
            chain,
            oracle: Arc::new(PimlicoGasOracle::new(&context.gas_price_url)?),
            bundler: Arc::new(HttpBundler::new(&context.bundler_url)?),
            sponsor,
            diagnostics,
        };
        info!(
            "Orchestrator ready on chain {} with entry point {:?}",
            context.chain_id, context.entry_point
        );
        Ok(Self::new(context, tuning, capabilities))
    }

    pub fn account_address(&self) -> Address {
        self.account.address()
    }

    /// Sends native currency; any token in the intent is ignored.
    pub async fn transfer(
        &self,
        intent: &TransferIntent,
    ) -> Result<UserOperationReceipt, OperationError> {
        let payload = self.builder.native_transfer(intent)?;
        self.submit(payload, intent.sponsor).await
    }

    pub async fn transfer_erc20(
        &self,
        intent: &TransferIntent,
    ) -> Result<UserOperationReceipt, OperationError> {
        let token = intent.token.ok_or(OperationError::MissingTokenAddress)?;
        let payload = self.builder.erc20_transfer(intent, token).await?;
        self.submit(payload, intent.sponsor).await
    }

    /// Gas the transfer would be submitted with. Nothing is checked or sent.
    ///
    /// `account` estimates for another deployed account instead of ours.
    pub async fn estimate_transfer(
        &self,
        intent: &TransferIntent,
        account: Option<Address>,
    ) -> Result<GasParameters, OperationError> {
        let payload = self.builder.transfer(intent).await?;
        let target = GasTarget::Calls(vec![payload]);
        match account {
            Some(address) if address != self.account.address() => {
                let watched =
                    WatchedAccount::new(address, self.context.entry_point, self.chain.clone());
                self.resolver.resolve(&watched, &target).await
            }
            _ => self.resolver.resolve(self.account.as_ref(), &target).await,
        }
    }

    /// Gas for pre-encoded account call data.
    pub async fn estimate_call_data(
        &self,
        call_data: Bytes,
    ) -> Result<GasParameters, OperationError> {
        self.resolver
            .resolve(self.account.as_ref(), &GasTarget::CallData(call_data))
            .await
    }

    pub async fn deploy(
        &self,
        spec: &DeploymentSpec,
    ) -> Result<UserOperationReceipt, OperationError> {
        let payload = self.builder.deployment(spec)?;
        self.submit(payload, spec.sponsor).await
    }

    pub async fn deploy_token(
        &self,
        spec: &TokenDeploymentSpec,
    ) -> Result<UserOperationReceipt, OperationError> {
        let payload = self.builder.token_deployment(spec)?;
        self.submit(payload, spec.sponsor).await
    }

    async fn submit(
        &self,
        payload: Call,
        sponsor: bool,
    ) -> Result<UserOperationReceipt, OperationError> {
        let sender = self.account.address();
        let gas = self
            .resolver
            .resolve(self.account.as_ref(), &GasTarget::Calls(vec![payload.clone()]))
            .await?;

        preflight::assert_account_deployed(
            self.chain.as_ref(),
            sender,
            self.context.chain_id,
            sponsor,
        )
        .await?;
        preflight::assert_can_prefund(
            self.chain.as_ref(),
            sender,
            &gas,
            self.tuning.prefund_cushion,
            sponsor,
        )
        .await?;

        let request = UserOperationRequest {
            payload,
            gas,
            sponsor,
        };
        self.executor.execute(self.account.as_ref(), request).await
    }
}
