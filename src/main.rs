// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenv::dotenv;
use ethers::signers::LocalWallet;
use ethers::types::Address;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod account;
mod builder;
mod bundler;
mod chain;
mod config;
mod contracts;
mod diagnostics;
mod error;
mod executor;
mod gas;
mod oracle;
mod orchestrator;
mod paymaster;
mod preflight;
mod rpc;
mod types;

#[cfg(test)]
mod test_utils;

use crate::config::{ChainContext, ChainContracts, Tuning};
use crate::orchestrator::Orchestrator;
use crate::rpc::{CourierRpcImpl, CourierRpcServer};

/// ERC-4337 v0.6 entry point, same address on every supported chain.
const DEFAULT_ENTRY_POINT: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, env = "RPC_SERVER_ADDR", default_value = "127.0.0.1:8546")]
    rpc_server_addr: String,

    /// Owner key of the smart account
    #[clap(short, long, env = "PRIVATE_KEY")]
    private_key: String,

    #[clap(short, long, env = "ACCOUNT_ADDRESS")]
    account_address: Address,

    #[clap(short, long, env = "CHAIN_ID")]
    chain_id: u64,

    #[clap(short, long, env = "ETH_RPC_URL")]
    eth_rpc_url: String,

    #[clap(long, env = "BUNDLER_URL")]
    bundler_url: String,

    /// Defaults to the bundler URL
    #[clap(long, env = "GAS_PRICE_URL")]
    gas_price_url: Option<String>,

    #[clap(long, env = "PAYMASTER_URL")]
    paymaster_url: Option<String>,

    #[clap(long, env = "DIAGNOSTICS_URL")]
    diagnostics_url: Option<String>,

    #[clap(long, env = "ENTRY_POINT", default_value = DEFAULT_ENTRY_POINT)]
    entry_point: Address,

    #[clap(long, env = "CREATE_CALL_CONTRACT")]
    create_call: Option<Address>,

    #[clap(long, env = "TOKEN_FACTORY_CONTRACT")]
    token_factory: Option<Address>,

    #[clap(long, env = "ACCOUNT_FACTORY")]
    account_factory: Option<Address>,

    #[clap(long, default_value_t = 600_000)]
    verification_gas_floor: u64,

    #[clap(long, default_value_t = 50_000)]
    prefund_cushion: u64,

    /// Seconds to wait for a user operation receipt
    #[clap(long, default_value_t = 120)]
    receipt_timeout: u64,

    #[clap(long, default_value_t = 2000)]
    receipt_poll_interval_ms: u64,
}

impl Args {
    fn chain_context(&self) -> ChainContext {
        ChainContext {
            chain_id: self.chain_id,
            rpc_url: self.eth_rpc_url.clone(),
            bundler_url: self.bundler_url.clone(),
            gas_price_url: self
                .gas_price_url
                .clone()
                .unwrap_or_else(|| self.bundler_url.clone()),
            paymaster_url: self.paymaster_url.clone(),
            diagnostics_url: self.diagnostics_url.clone(),
            entry_point: self.entry_point,
            contracts: ChainContracts {
                create_call: self.create_call,
                token_factory: self.token_factory,
                account_factory: self.account_factory,
            },
        }
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            verification_gas_floor: self.verification_gas_floor,
            prefund_cushion: self.prefund_cushion,
            receipt_timeout: Duration::from_secs(self.receipt_timeout),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let owner = args.private_key.parse::<LocalWallet>()?;
    let orchestrator = Orchestrator::connect(
        args.chain_context(),
        args.tuning(),
        owner,
        args.account_address,
    )?;

    let server_addr: SocketAddr = args.rpc_server_addr.parse()?;
    let courier_rpc = CourierRpcImpl::new(Arc::new(orchestrator));

    info!("Starting user operation courier RPC server on {}", server_addr);

    let server_handle = start_server(server_addr, courier_rpc).await?;

    tokio::signal::ctrl_c().await?;
    server_handle.stop()?;
    info!("Server stopped");

    Ok(())
}

async fn start_server(
    server_addr: SocketAddr,
    courier_rpc: CourierRpcImpl,
) -> anyhow::Result<ServerHandle> {
    let server = ServerBuilder::default().build(server_addr).await?;
    let server_handle = server.start(courier_rpc.into_rpc());

    Ok(server_handle)
}
