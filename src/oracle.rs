// src/oracle.rs
use std::fmt::Display;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::error::OperationError;
use crate::types::GasPrice;

const GAS_PRICE_METHOD: &str = "pimlico_getUserOperationGasPrice";

/// Source of the recommended user operation fee pair.
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    async fn user_operation_gas_price(&self, chain_id: u64) -> Result<GasPrice, OperationError>;
}

#[derive(Debug, Deserialize)]
struct GasPriceTiers {
    standard: GasPrice,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<GasPriceTiers>,
    error: Option<JsonRpcError>,
}

/// Pimlico-style gas price endpoint. One request per call, never retried or cached.
pub struct PimlicoGasOracle {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl PimlicoGasOracle {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: reqwest::Url::parse(url)?,
        })
    }
}

fn unavailable(chain_id: u64, reason: impl Display) -> OperationError {
    error!("Gas price request failed on chain {}: {}", chain_id, reason);
    OperationError::GasPriceUnavailable(reason.to_string())
}

#[async_trait]
impl GasPriceOracle for PimlicoGasOracle {
    async fn user_operation_gas_price(&self, chain_id: u64) -> Result<GasPrice, OperationError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": GAS_PRICE_METHOD,
            "params": [],
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| unavailable(chain_id, e))?;
        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| unavailable(chain_id, e))?;

        if let Some(err) = response.error {
            return Err(unavailable(
                chain_id,
                format!("{} (code {})", err.message, err.code),
            ));
        }
        let tiers = response
            .result
            .ok_or_else(|| unavailable(chain_id, "response carries no result"))?;

        debug!(
            "Gas price on chain {}: maxFeePerGas={} maxPriorityFeePerGas={}",
            chain_id, tiers.standard.max_fee_per_gas, tiers.standard.max_priority_fee_per_gas
        );
        Ok(tiers.standard)
    }
}
