//! Shared test helpers for fast withdraw tests
//!
//! Constants, default config builders, and `MockNetwork`: an in-memory
//! ledger implementing both `ChainClient` (one `MockChain` per chain id)
//! and `ChannelNode`, so whole flows run without a node or RPC endpoint.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chain_clients_evm::{EvmWallet, TransactionRequest, NATIVE_ASSET_ID};
use fast_withdraw::chain::{ChainClient, TxReceipt};
use fast_withdraw::channel::{
    ChannelNode, ChannelNodeError, ConnectParams, NodeReceipt, NodeResult, SessionHandle, TransferParams,
    WithdrawParams,
};
use fast_withdraw::config::{
    ChainConfig, FastWithdrawConfig, IdentityConfig, ServiceConfig, TransferConfig,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Well-known development private key (account #0 of the default dev mnemonic)
pub const ROOT_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address of ROOT_PRIVATE_KEY
pub const ROOT_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Well-known development private key (account #1)
pub const OTHER_PRIVATE_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Address of OTHER_PRIVATE_KEY
pub const OTHER_ADDRESS: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

pub const CHILD_CHAIN_ID: u64 = 80001;
pub const PARENT_CHAIN_ID: u64 = 5;

/// 1.0 ether in wei
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Dummy token address (EVM format, 40 hex characters)
pub const DUMMY_TOKEN_ADDR_EVM: &str = "0x000000000000000000000000000000000000000a";

/// Gas charged by `MockChain` per transaction
pub const MOCK_GAS_COST: u128 = 21_000 * 1_000_000_000;

// ============================================================================
// CONFIG BUILDERS
// ============================================================================

/// Create a default service config with test values.
/// This can be customized using Rust's struct update syntax:
/// ```
/// let service = ServiceConfig {
///     poll_interval_ms: 50,
///     ..create_default_service_config()
/// };
/// ```
pub fn create_default_service_config() -> ServiceConfig {
    ServiceConfig {
        channel_node_url: "http://127.0.0.1:8080".to_string(),
        store_dir: ".fast-withdraw/store".to_string(),
        confirmation_timeout_ms: 1_000,
        poll_interval_ms: 10,
    }
}

pub fn create_default_child_chain_config() -> ChainConfig {
    ChainConfig {
        name: "child".to_string(),
        rpc_url: "http://127.0.0.1:8545".to_string(),
        chain_id: CHILD_CHAIN_ID,
    }
}

pub fn create_default_parent_chain_config() -> ChainConfig {
    ChainConfig {
        name: "parent".to_string(),
        rpc_url: "http://127.0.0.1:8546".to_string(),
        chain_id: PARENT_CHAIN_ID,
    }
}

pub fn create_default_transfer_config() -> TransferConfig {
    TransferConfig {
        amount_wei: ONE_ETHER.to_string(),
        asset_id: NATIVE_ASSET_ID.to_string(),
        withdraw_recipient: None,
    }
}

/// Create a complete valid configuration with test values.
pub fn create_default_config() -> FastWithdrawConfig {
    FastWithdrawConfig {
        service: create_default_service_config(),
        identity: IdentityConfig::default(),
        child_chain: create_default_child_chain_config(),
        parent_chain: create_default_parent_chain_config(),
        transfer: create_default_transfer_config(),
    }
}

pub fn root_wallet() -> EvmWallet {
    EvmWallet::from_private_key_hex(ROOT_PRIVATE_KEY).unwrap()
}

// ============================================================================
// MOCK NETWORK
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockChannel {
    pub chain_id: u64,
    pub handle: SessionHandle,
    /// Free balance of the channel owner, per asset
    pub free: HashMap<String, u128>,
}

#[derive(Debug, Default)]
pub struct MockLedger {
    /// (chain id, address) -> on-chain native balance
    pub on_chain: HashMap<(u64, String), u128>,
    /// public identifier -> channel
    pub channels: HashMap<String, MockChannel>,
    /// (public identifier, asset) pairs with node-side deposit rights held
    pub rights_held: HashSet<(String, String)>,
    /// Ordered log of node calls, e.g. "request:<id>:<asset>"
    pub calls: Vec<String>,
    pub transfers: Vec<TransferParams>,
    pub connect_count: usize,
    next_channel: u64,
    next_tx: u64,
    pub fail_connect_on: Option<u64>,
    pub fail_send_on: Option<u64>,
    pub fail_balance_query_on: Option<u64>,
    pub fail_rescind: bool,
    pub reject_transfers: Option<String>,
    pub reject_withdrawals: Option<String>,
    /// Deposits reach the chain but are never credited to the channel
    pub skip_deposit_credit: bool,
    /// Withdrawals leave the channel but never reach the recipient on-chain
    pub skip_withdrawal_credit: bool,
}

/// Shared in-memory chains and channel node.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    inner: Arc<Mutex<MockLedger>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain client view of one chain.
    pub fn chain(&self, chain_id: u64) -> MockChain {
        MockChain {
            chain_id,
            network: self.clone(),
        }
    }

    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut MockLedger) -> R) -> R {
        let mut ledger = self.inner.lock().unwrap();
        f(&mut ledger)
    }

    pub fn fund(&self, chain_id: u64, address: &str, amount: u128) {
        self.with_ledger(|l| {
            *l.on_chain.entry((chain_id, address.to_lowercase())).or_default() += amount;
        });
    }

    pub fn on_chain_balance(&self, chain_id: u64, address: &str) -> u128 {
        self.with_ledger(|l| {
            l.on_chain
                .get(&(chain_id, address.to_lowercase()))
                .copied()
                .unwrap_or(0)
        })
    }

    pub fn free_balance(&self, public_identifier: &str, asset_id: &str) -> u128 {
        self.with_ledger(|l| {
            l.channels
                .get(public_identifier)
                .and_then(|c| c.free.get(&asset_id.to_lowercase()).copied())
                .unwrap_or(0)
        })
    }

    pub fn credit_channel(&self, public_identifier: &str, asset_id: &str, amount: u128) {
        self.with_ledger(|l| {
            if let Some(channel) = l.channels.get_mut(public_identifier) {
                *channel.free.entry(asset_id.to_lowercase()).or_default() += amount;
            }
        });
    }

    /// Marks node-side deposit rights as held by someone else.
    pub fn hold_rights(&self, public_identifier: &str, asset_id: &str) {
        self.with_ledger(|l| {
            l.rights_held
                .insert((public_identifier.to_string(), asset_id.to_lowercase()));
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_ledger(|l| l.calls.clone())
    }

    pub fn transfers(&self) -> Vec<TransferParams> {
        self.with_ledger(|l| l.transfers.clone())
    }

    pub fn connect_count(&self) -> usize {
        self.with_ledger(|l| l.connect_count)
    }

    fn next_tx_hash(ledger: &mut MockLedger) -> String {
        ledger.next_tx += 1;
        format!("0x{:064x}", ledger.next_tx)
    }
}

pub struct MockChain {
    chain_id: u64,
    network: MockNetwork,
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_balance(&self, address: &str) -> Result<u128> {
        if self.network.with_ledger(|l| l.fail_balance_query_on) == Some(self.chain_id) {
            anyhow::bail!("connection refused");
        }
        Ok(self.network.on_chain_balance(self.chain_id, address))
    }

    async fn send_transaction(&self, wallet: &EvmWallet, tx: &TransactionRequest) -> Result<TxReceipt> {
        let chain_id = self.chain_id;
        self.network.with_ledger(|l| {
            if l.fail_send_on == Some(chain_id) {
                anyhow::bail!("Transaction reverted");
            }
            let from = (chain_id, wallet.address().to_string());
            let balance = l.on_chain.get(&from).copied().unwrap_or(0);
            let cost = tx.value + MOCK_GAS_COST;
            if balance < cost {
                anyhow::bail!("insufficient funds for gas * price + value");
            }
            l.on_chain.insert(from, balance - cost);
            *l.on_chain.entry((chain_id, tx.to.to_lowercase())).or_default() += tx.value;

            if !l.skip_deposit_credit {
                let to = tx.to.to_lowercase();
                if let Some(channel) = l
                    .channels
                    .values_mut()
                    .find(|c| c.chain_id == chain_id && c.handle.multisig_address == to)
                {
                    *channel.free.entry(NATIVE_ASSET_ID.to_string()).or_default() += tx.value;
                }
            }

            Ok(TxReceipt {
                tx_hash: MockNetwork::next_tx_hash(l),
                block_number: Some(1),
            })
        })
    }
}

#[async_trait]
impl ChannelNode for MockNetwork {
    async fn connect(&self, params: &ConnectParams) -> NodeResult<SessionHandle> {
        self.with_ledger(|l| {
            l.connect_count += 1;
            if l.fail_connect_on == Some(params.chain_id) {
                return Err(ChannelNodeError::Rejected(format!(
                    "chain {} unavailable",
                    params.chain_id
                )));
            }

            if let Some(previous) = &params.resume {
                if let Some(channel) = l.channels.get(&previous.public_identifier) {
                    if channel.chain_id == params.chain_id
                        && channel.handle.signer_address == params.signer_address
                    {
                        return Ok(channel.handle.clone());
                    }
                }
            }

            l.next_channel += 1;
            let handle = SessionHandle {
                signer_address: params.signer_address.clone(),
                multisig_address: format!("0x{:040x}", 0x1000 + l.next_channel),
                public_identifier: format!("vector{:06}", l.next_channel),
            };
            l.channels.insert(
                handle.public_identifier.clone(),
                MockChannel {
                    chain_id: params.chain_id,
                    handle: handle.clone(),
                    free: HashMap::new(),
                },
            );
            Ok(handle)
        })
    }

    async fn get_free_balance(
        &self,
        session: &SessionHandle,
        asset_id: &str,
    ) -> NodeResult<HashMap<String, u128>> {
        self.with_ledger(|l| {
            let channel = l
                .channels
                .get(&session.public_identifier)
                .ok_or_else(|| ChannelNodeError::Rejected("unknown channel".to_string()))?;
            if l.fail_balance_query_on == Some(channel.chain_id) {
                return Err(ChannelNodeError::Transport(anyhow::anyhow!("node unreachable")));
            }
            let mut balances = HashMap::new();
            if let Some(amount) = channel.free.get(&asset_id.to_lowercase()) {
                balances.insert(channel.handle.signer_address.clone(), *amount);
            }
            Ok(balances)
        })
    }

    async fn request_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt> {
        self.with_ledger(|l| {
            l.calls
                .push(format!("request:{}:{}", session.public_identifier, asset_id));
            let key = (session.public_identifier.clone(), asset_id.to_lowercase());
            if !l.rights_held.insert(key) {
                return Err(ChannelNodeError::DepositRightsHeld(
                    "deposit in progress".to_string(),
                ));
            }
            Ok(NodeReceipt {
                id: format!("rights-{}", session.public_identifier),
                tx_hash: None,
            })
        })
    }

    async fn rescind_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt> {
        self.with_ledger(|l| {
            l.calls
                .push(format!("rescind:{}:{}", session.public_identifier, asset_id));
            if l.fail_rescind {
                return Err(ChannelNodeError::Transport(anyhow::anyhow!("node unreachable")));
            }
            l.rights_held
                .remove(&(session.public_identifier.clone(), asset_id.to_lowercase()));
            Ok(NodeReceipt {
                id: format!("rescind-{}", session.public_identifier),
                tx_hash: None,
            })
        })
    }

    async fn transfer(&self, session: &SessionHandle, params: &TransferParams) -> NodeResult<NodeReceipt> {
        self.with_ledger(|l| {
            if let Some(reason) = &l.reject_transfers {
                return Err(ChannelNodeError::Rejected(reason.clone()));
            }
            if !l.channels.contains_key(&params.recipient) {
                return Err(ChannelNodeError::Rejected(format!(
                    "unknown recipient {}",
                    params.recipient
                )));
            }
            let asset = params.asset_id.to_lowercase();
            let sender = l
                .channels
                .get_mut(&session.public_identifier)
                .ok_or_else(|| ChannelNodeError::Rejected("unknown channel".to_string()))?;
            let available = sender.free.get(&asset).copied().unwrap_or(0);
            if available < params.amount {
                return Err(ChannelNodeError::InsufficientFunds(format!(
                    "available {}",
                    available
                )));
            }
            sender.free.insert(asset, available - params.amount);

            if let Some(recipient) = l.channels.get_mut(&params.recipient) {
                *recipient
                    .free
                    .entry(params.meta.receiver_asset_id.to_lowercase())
                    .or_default() += params.amount;
            }
            l.transfers.push(params.clone());
            Ok(NodeReceipt {
                id: format!("transfer-{}", l.transfers.len()),
                tx_hash: None,
            })
        })
    }

    async fn withdraw(&self, session: &SessionHandle, params: &WithdrawParams) -> NodeResult<NodeReceipt> {
        self.with_ledger(|l| {
            if let Some(reason) = &l.reject_withdrawals {
                return Err(ChannelNodeError::Rejected(reason.clone()));
            }
            let asset = params.asset_id.to_lowercase();
            let channel = l
                .channels
                .get_mut(&session.public_identifier)
                .ok_or_else(|| ChannelNodeError::Rejected("unknown channel".to_string()))?;
            let available = channel.free.get(&asset).copied().unwrap_or(0);
            if available < params.amount {
                return Err(ChannelNodeError::InsufficientFunds(format!(
                    "available {}",
                    available
                )));
            }
            channel.free.insert(asset, available - params.amount);
            let chain_id = channel.chain_id;
            if !l.skip_withdrawal_credit {
                *l.on_chain
                    .entry((chain_id, params.recipient.to_lowercase()))
                    .or_default() += params.amount;
            }

            let tx_hash = MockNetwork::next_tx_hash(l);
            Ok(NodeReceipt {
                id: format!("withdrawal-{}", l.next_tx),
                tx_hash: Some(tx_hash),
            })
        })
    }
}

/// Poll interval used by verifiers in tests.
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// SESSION HELPERS
// ============================================================================

/// Opens the child and parent sessions for the root's "child" and "parent" identities.
pub async fn open_test_sessions(
    network: &MockNetwork,
    store: fast_withdraw::channel::SessionStore,
) -> (fast_withdraw::channel::ChannelSession, fast_withdraw::channel::ChannelSession) {
    use fast_withdraw::channel::{ChainRole, ChannelSessionManager, SessionRequest};
    use fast_withdraw::identity::{derive, RootIdentity};

    let root = RootIdentity::from_private_key_hex(ROOT_PRIVATE_KEY).unwrap();
    let manager = ChannelSessionManager::new(Arc::new(network.clone()), store);
    let mut sessions = manager
        .open(vec![
            SessionRequest {
                role: ChainRole::Child,
                identity: derive(&root, "child").unwrap().into_wallet(),
                chain: create_default_child_chain_config(),
            },
            SessionRequest {
                role: ChainRole::Parent,
                identity: derive(&root, "parent").unwrap().into_wallet(),
                chain: create_default_parent_chain_config(),
            },
        ])
        .await
        .unwrap();

    let parent = sessions.pop().unwrap();
    let child = sessions.pop().unwrap();
    (child, parent)
}
