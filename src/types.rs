// src/types.rs
use ethers::abi::{encode, AbiEncode, Token};
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::contracts::TransferCall;

/// ERC-4337 v0.6 user operation as sent over the bundler RPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// ABI-encodes every field except the signature, hashing the dynamic ones.
    pub fn pack_without_signature(&self) -> Bytes {
        encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(&self.init_code).to_vec()),
            Token::FixedBytes(keccak256(&self.call_data).to_vec()),
            Token::Uint(self.call_gas_limit),
            Token::Uint(self.verification_gas_limit),
            Token::Uint(self.pre_verification_gas),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
            Token::FixedBytes(keccak256(&self.paymaster_and_data).to_vec()),
        ])
        .into()
    }

    /// The `userOpHash` the entry point hands to `validateUserOp`.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        let op_hash = keccak256(self.pack_without_signature());
        H256::from(keccak256(encode(&[
            Token::FixedBytes(op_hash.to_vec()),
            Token::Address(entry_point),
            Token::Uint(U256::from(chain_id)),
        ])))
    }

    pub fn with_gas(mut self, gas: &GasParameters) -> Self {
        self.call_gas_limit = gas.call_gas_limit;
        self.verification_gas_limit = gas.verification_gas_limit;
        self.pre_verification_gas = gas.pre_verification_gas;
        self.max_fee_per_gas = gas.max_fee_per_gas;
        self.max_priority_fee_per_gas = gas.max_priority_fee_per_gas;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Gas limits reported by `eth_estimateUserOperationGas`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasParameters {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    pub recipient: Address,
    /// Human readable amount, e.g. "0.01".
    pub amount: String,
    #[serde(default)]
    pub token: Option<Address>,
    #[serde(default)]
    pub sponsor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Creation bytecode including constructor arguments.
    pub init_code: Bytes,
    #[serde(default)]
    pub value: U256,
    /// Generated when absent.
    #[serde(default)]
    pub salt: Option<H256>,
    #[serde(default)]
    pub sponsor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDeploymentSpec {
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub minter: Address,
    #[serde(default)]
    pub init_mint: Option<String>,
    pub max_supply: String,
    #[serde(default)]
    pub sponsor: bool,
}

/// A single call executed by the smart account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    NativeTransfer {
        to: Address,
        value: U256,
    },
    Erc20Transfer {
        token: Address,
        to: Address,
        amount: U256,
    },
    ContractCall {
        to: Address,
        value: U256,
        data: Bytes,
    },
}

impl Call {
    pub fn target(&self) -> Address {
        match self {
            Call::NativeTransfer { to, .. } => *to,
            Call::Erc20Transfer { token, .. } => *token,
            Call::ContractCall { to, .. } => *to,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            Call::NativeTransfer { value, .. } | Call::ContractCall { value, .. } => *value,
            Call::Erc20Transfer { .. } => U256::zero(),
        }
    }

    pub fn data(&self) -> Bytes {
        match self {
            Call::NativeTransfer { .. } => Bytes::default(),
            Call::Erc20Transfer { to, amount, .. } => TransferCall {
                to: *to,
                amount: *amount,
            }
            .encode()
            .into(),
            Call::ContractCall { data, .. } => data.clone(),
        }
    }
}

/// What the gas resolver estimates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasTarget {
    Calls(Vec<Call>),
    CallData(Bytes),
}

/// Everything the executor needs for one submission attempt. The sender is
/// always the account the executor signs with.
#[derive(Debug)]
pub struct UserOperationRequest {
    pub payload: Call,
    pub gas: GasParameters,
    pub sponsor: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: H256,
    pub sender: Address,
    pub nonce: U256,
    #[serde(default)]
    pub paymaster: Option<Address>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
    pub receipt: TransactionReceipt,
}

impl UserOperationReceipt {
    pub fn transaction_hash(&self) -> H256 {
        self.receipt.transaction_hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterResponse {
    pub paymaster_and_data: Bytes,
}
