//! Open channel sessions

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chain_clients_evm::{normalize_address, EvmWallet};
use serde::Serialize;

use super::{ChannelNode, NodeReceipt, NodeResult, SessionHandle, TransferParams, WithdrawParams};

/// Which side of the fast withdraw a session sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainRole {
    /// Chain the value starts on
    Child,
    /// Chain the value is withdrawn on
    Parent,
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRole::Child => write!(f, "child"),
            ChainRole::Parent => write!(f, "parent"),
        }
    }
}

/// One open payment-channel participation on one chain.
#[derive(Clone)]
pub struct ChannelSession {
    role: ChainRole,
    chain_id: u64,
    identity: EvmWallet,
    handle: SessionHandle,
    node: Arc<dyn ChannelNode>,
}

impl ChannelSession {
    pub fn new(
        role: ChainRole,
        chain_id: u64,
        identity: EvmWallet,
        handle: SessionHandle,
        node: Arc<dyn ChannelNode>,
    ) -> Self {
        Self {
            role,
            chain_id,
            identity,
            handle,
            node,
        }
    }

    pub fn role(&self) -> ChainRole {
        self.role
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn identity(&self) -> &EvmWallet {
        &self.identity
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn signer_address(&self) -> &str {
        &self.handle.signer_address
    }

    pub fn multisig_address(&self) -> &str {
        &self.handle.multisig_address
    }

    pub fn public_identifier(&self) -> &str {
        &self.handle.public_identifier
    }

    /// Free balance of `asset_id` held by `address`; zero when the node has no entry.
    pub async fn free_balance_of(&self, address: &str, asset_id: &str) -> NodeResult<u128> {
        let balances = self.node.get_free_balance(&self.handle, asset_id).await?;
        let wanted = normalize_address(address).unwrap_or_else(|_| address.to_lowercase());
        Ok(balances
            .iter()
            .find(|(holder, _)| holder.to_lowercase() == wanted)
            .map(|(_, amount)| *amount)
            .unwrap_or(0))
    }

    pub async fn request_deposit_rights(&self, asset_id: &str) -> NodeResult<NodeReceipt> {
        self.node.request_deposit_rights(&self.handle, asset_id).await
    }

    pub async fn rescind_deposit_rights(&self, asset_id: &str) -> NodeResult<NodeReceipt> {
        self.node.rescind_deposit_rights(&self.handle, asset_id).await
    }

    pub async fn transfer(&self, params: &TransferParams) -> NodeResult<NodeReceipt> {
        self.node.transfer(&self.handle, params).await
    }

    pub async fn withdraw(&self, params: &WithdrawParams) -> NodeResult<NodeReceipt> {
        self.node.withdraw(&self.handle, params).await
    }
}

impl fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("role", &self.role)
            .field("chain_id", &self.chain_id)
            .field("handle", &self.handle)
            .finish()
    }
}
