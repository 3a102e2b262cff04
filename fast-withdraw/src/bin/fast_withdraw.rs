//! Fast Withdraw
//!
//! Runs the fast withdraw flow once and exits: deposit into the child-chain
//! session, transfer to the parent-chain session, withdraw to the recipient.
//!
//! ## Usage
//!
//! ```bash
//! FAST_WITHDRAW_ROOT_PRIVATE_KEY=0x... cargo run --bin fast-withdraw -- --config fast-withdraw.toml
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! FAST_WITHDRAW_CONFIG_PATH=fast-withdraw.toml cargo run --bin fast-withdraw
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use chain_clients_evm::{format_ether, EvmClient};
use clap::Parser;
use fast_withdraw::{
    config::{FastWithdrawConfig, CONFIG_PATH_ENV},
    ChainEndpoint, ChannelSessionManager, DepositRightsRegistry, FastWithdrawFlow, FlowReport, FlowSettings,
    HttpChannelNode, RootIdentity, SessionStore,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fast-withdraw")]
#[command(about = "Moves value from a child-chain channel session to a parent-chain withdrawal")]
struct Args {
    /// Path to configuration file (default: config/fast-withdraw.toml or FAST_WITHDRAW_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting fast withdraw");

    // Priority: CLI arg > env var > default
    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            FastWithdrawConfig::load_from_path(Some(path))?
        }
        None => {
            if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
                info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path);
            } else {
                info!("Loading configuration from default location");
            }
            FastWithdrawConfig::load()?
        }
    };

    info!("Channel node: {}", config.service.channel_node_url);
    info!("Child chain: {} (chain ID: {})", config.child_chain.name, config.child_chain.chain_id);
    info!("Parent chain: {} (chain ID: {})", config.parent_chain.name, config.parent_chain.chain_id);

    let root = RootIdentity::from_private_key_hex(&config.root_private_key()?)
        .context("Failed to load root identity")?;
    info!("Root address: {}", root.address());

    let child_client = EvmClient::new(&config.child_chain.rpc_url, config.child_chain.chain_id)?;
    let parent_client = EvmClient::new(&config.parent_chain.rpc_url, config.parent_chain.chain_id)?;
    let node = Arc::new(HttpChannelNode::new(&config.service.channel_node_url)?);
    let sessions = ChannelSessionManager::new(node, SessionStore::new(&config.service.store_dir));

    let mut flow = FastWithdrawFlow::new(
        FlowSettings::from_config(&config)?,
        root,
        ChainEndpoint::new(config.child_chain.clone(), Arc::new(child_client)),
        ChainEndpoint::new(config.parent_chain.clone(), Arc::new(parent_client)),
        sessions,
        Arc::new(DepositRightsRegistry::new()),
    );

    match flow.run().await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(failure) => {
            error!("Fast withdraw stopped after {:?}", failure.last_state);
            print_report(&failure.report);
            Err(failure.into())
        }
    }
}

fn print_report(report: &FlowReport) {
    println!("Fast withdraw: {:?}", report.final_state);
    println!("  root:   {}", report.root_address);
    println!("  amount: {} ({} ether)", report.amount, format_ether(report.amount));
    for session in &report.sessions {
        println!(
            "  {} session on chain {}: signer {} multisig {} id {}",
            session.role, session.chain_id, session.signer_address, session.multisig_address, session.public_identifier
        );
    }
    if let Some(deposit) = &report.deposit {
        println!("  deposit tx:    {}", deposit.tx_hash);
    }
    if let Some(transfer) = &report.transfer {
        println!("  transfer id:   {}", transfer.transfer_id);
    }
    if let Some(withdrawal) = &report.withdrawal {
        println!(
            "  withdrawal:    {} (tx {})",
            withdrawal.withdrawal_id,
            withdrawal.tx_hash.as_deref().unwrap_or("pending")
        );
    }
    for recorded in &report.snapshots {
        let snapshot = &recorded.snapshot;
        let free = snapshot
            .channel_free_balance
            .map(|b| format!("{} ether free", format_ether(b)))
            .unwrap_or_else(|| "no session".to_string());
        println!(
            "  [{:?}] {} {} on chain {}: {} ether on chain, {}",
            recorded.stage,
            recorded.subject,
            snapshot.address,
            snapshot.chain_id,
            format_ether(snapshot.on_chain_balance),
            free
        );
    }
}
