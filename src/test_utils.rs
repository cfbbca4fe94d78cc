// src/test_utils.rs
//! In-memory stand-ins for the chain, bundler, oracle and paymaster.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::providers::ProviderError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

use crate::account::SimpleAccount;
use crate::chain::ChainReader;
use crate::diagnostics::{DiagnosticReport, DiagnosticsSink};
use crate::error::OperationError;
use crate::oracle::GasPriceOracle;
use crate::paymaster::Sponsor;
use crate::types::{GasEstimate, GasPrice, UserOperation, UserOperationReceipt};

pub const TEST_OWNER_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_CHAIN_ID: u64 = 10;

pub fn test_entry_point() -> Address {
    Address::repeat_byte(0x5f)
}

pub fn test_account(chain: Arc<MockChain>) -> SimpleAccount {
    SimpleAccount::new(
        TEST_OWNER_KEY.parse().expect("valid test key"),
        Address::repeat_byte(0xaa),
        TEST_CHAIN_ID,
        test_entry_point(),
        chain,
    )
}

pub struct MockChain {
    code: Mutex<Bytes>,
    balance: U256,
    decimals: Option<u8>,
    reads: AtomicUsize,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            code: Mutex::new(Bytes::default()),
            balance: U256::zero(),
            decimals: Some(18),
            reads: AtomicUsize::new(0),
        }
    }
}

impl MockChain {
    pub fn deployed(self) -> Self {
        self.set_code(Bytes::from(vec![0x60, 0x80, 0x60, 0x40]));
        self
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn without_decimals(mut self) -> Self {
        self.decimals = None;
        self
    }

    pub fn set_code(&self, code: Bytes) {
        *self.code.lock().unwrap() = code;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_code(&self, _address: Address) -> Result<Bytes, OperationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.lock().unwrap().clone())
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, OperationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }

    async fn erc20_decimals(&self, token: Address) -> Result<u8, OperationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.decimals
            .ok_or_else(|| OperationError::ChainRead(format!("decimals() on {token:?}: execution reverted")))
    }

    async fn entry_point_nonce(
        &self,
        _entry_point: Address,
        _sender: Address,
    ) -> Result<U256, OperationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(U256::zero())
    }
}

pub struct MockOracle {
    pub price: GasPrice,
    fail: bool,
    calls: AtomicUsize,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self {
            price: GasPrice {
                max_fee_per_gas: U256::from(1_000_000_000u64),
                max_priority_fee_per_gas: U256::from(100_000_000u64),
            },
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockOracle {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GasPriceOracle for MockOracle {
    async fn user_operation_gas_price(&self, _chain_id: u64) -> Result<GasPrice, OperationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OperationError::GasPriceUnavailable(
                "HTTP error! status: 500".to_string(),
            ));
        }
        Ok(self.price)
    }
}

pub struct MockBundler {
    estimate: GasEstimate,
    estimate_error: Option<String>,
    send_error: Option<String>,
    receipt_error: Option<String>,
    /// Number of empty polls before the receipt shows up; `None` never includes.
    receipt_after: Option<usize>,
    estimates: AtomicUsize,
    submissions: AtomicUsize,
    polls: AtomicUsize,
    last_estimated: Mutex<Option<UserOperation>>,
    last_submitted: Mutex<Option<UserOperation>>,
}

impl Default for MockBundler {
    fn default() -> Self {
        Self {
            estimate: GasEstimate {
                call_gas_limit: U256::from(60_000u64),
                verification_gas_limit: U256::from(150_000u64),
                pre_verification_gas: U256::from(48_000u64),
            },
            estimate_error: None,
            send_error: None,
            receipt_error: None,
            receipt_after: Some(0),
            estimates: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            last_estimated: Mutex::new(None),
            last_submitted: Mutex::new(None),
        }
    }
}

impl MockBundler {
    pub fn with_estimate(mut self, estimate: GasEstimate) -> Self {
        self.estimate = estimate;
        self
    }

    pub fn failing_estimate(mut self, message: &str) -> Self {
        self.estimate_error = Some(message.to_string());
        self
    }

    pub fn failing_send(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    pub fn failing_receipt(mut self, message: &str) -> Self {
        self.receipt_error = Some(message.to_string());
        self
    }

    pub fn receipt_after_polls(mut self, polls: usize) -> Self {
        self.receipt_after = Some(polls);
        self
    }

    pub fn never_included(mut self) -> Self {
        self.receipt_after = None;
        self
    }

    pub fn estimates(&self) -> usize {
        self.estimates.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn last_estimated(&self) -> Option<UserOperation> {
        self.last_estimated.lock().unwrap().clone()
    }

    pub fn last_submitted(&self) -> Option<UserOperation> {
        self.last_submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl crate::bundler::BundlerClient for MockBundler {
    async fn estimate_user_operation_gas(
        &self,
        user_op: &UserOperation,
        _entry_point: Address,
    ) -> Result<GasEstimate, ProviderError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        *self.last_estimated.lock().unwrap() = Some(user_op.clone());
        match &self.estimate_error {
            Some(message) => Err(ProviderError::CustomError(message.clone())),
            None => Ok(self.estimate),
        }
    }

    async fn send_user_operation(
        &self,
        user_op: &UserOperation,
        entry_point: Address,
    ) -> Result<H256, ProviderError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        *self.last_submitted.lock().unwrap() = Some(user_op.clone());
        match &self.send_error {
            Some(message) => Err(ProviderError::CustomError(message.clone())),
            None => Ok(user_op.hash(entry_point, TEST_CHAIN_ID)),
        }
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: H256,
    ) -> Result<Option<UserOperationReceipt>, ProviderError> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.receipt_error {
            return Err(ProviderError::CustomError(message.clone()));
        }
        let Some(receipt_after) = self.receipt_after else {
            return Ok(None);
        };
        if polls < receipt_after {
            return Ok(None);
        }

        let sender = self
            .last_submitted
            .lock()
            .unwrap()
            .as_ref()
            .map(|op| op.sender)
            .unwrap_or_default();
        Ok(Some(UserOperationReceipt {
            user_op_hash,
            sender,
            actual_gas_cost: U256::from(21_000_000_000_000u64),
            actual_gas_used: U256::from(21_000u64),
            success: true,
            receipt: TransactionReceipt {
                transaction_hash: H256::repeat_byte(0x77),
                ..Default::default()
            },
            ..Default::default()
        }))
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    reports: Mutex<Vec<DiagnosticReport>>,
}

impl RecordingDiagnostics {
    pub fn reports(&self) -> Vec<DiagnosticReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn report(&self, report: DiagnosticReport) {
        self.reports.lock().unwrap().push(report);
    }
}

pub struct MockSponsor(pub Bytes);

#[async_trait]
impl Sponsor for MockSponsor {
    async fn sponsor(&self, _user_op: &UserOperation) -> Result<Bytes, OperationError> {
        Ok(self.0.clone())
    }
}

/// Answers a single HTTP request with `status` and a JSON `body`.
///
/// Returns the URL to hit and a handle resolving to the raw request text.
pub async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (url, handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}
