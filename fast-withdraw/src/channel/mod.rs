//! Payment channel capability
//!
//! The channel node owns channel state, signs channel updates and submits
//! on-chain withdrawals. This module defines the capability the flow needs
//! from it, the session wrapper the flow holds, and the components that
//! manage sessions and deposit rights.

pub mod http;
pub mod manager;
pub mod rights;
pub mod session;
pub mod store;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpChannelNode;
pub use manager::{connect_message, ChannelSessionManager, SessionRequest};
pub use rights::{DepositRightsGuard, DepositRightsRegistry};
pub use session::{ChainRole, ChannelSession};
pub use store::{SessionRecord, SessionStore};

// ============================================================================
// WIRE TYPES
// ============================================================================

/// What the node returns for an opened (or resumed) channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    /// Address signing channel updates for this participant
    pub signer_address: String,
    /// On-chain settlement contract receiving deposits
    pub multisig_address: String,
    /// Routing identifier other participants transfer to
    pub public_identifier: String,
}

/// Connect request for one chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub signer_address: String,
    pub chain_id: u64,
    pub eth_provider_url: String,
    /// EIP-191 signature by the signer over `connect_message(chain_id, signer_address)`
    pub signature: String,
    /// Previously persisted handle the node should resume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<SessionHandle>,
}

/// Acknowledgement of a node operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeReceipt {
    pub id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Routing metadata attached to a transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferMeta {
    pub receiver_asset_id: String,
    pub receiver_chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    /// Recipient routing identifier
    pub recipient: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub asset_id: String,
    pub meta: TransferMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawParams {
    /// On-chain recipient address
    pub recipient: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub asset_id: String,
}

/// Amounts travel as decimal strings.
pub(crate) mod amount_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let value = String::deserialize(deserializer)?;
        value
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid amount '{}'", value)))
    }
}

// ============================================================================
// CAPABILITY
// ============================================================================

/// Failure classes reported by a channel node.
#[derive(Debug, Error)]
pub enum ChannelNodeError {
    #[error("deposit rights already held: {0}")]
    DepositRightsHeld(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("rejected by channel node: {0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type NodeResult<T> = std::result::Result<T, ChannelNodeError>;

/// Operations the flow needs from a channel node.
///
/// Every operation except `connect` is addressed to an already opened
/// session by its handle.
#[async_trait]
pub trait ChannelNode: Send + Sync {
    async fn connect(&self, params: &ConnectParams) -> NodeResult<SessionHandle>;

    /// Free (unlocked) balance of `asset_id` per participant address.
    async fn get_free_balance(
        &self,
        session: &SessionHandle,
        asset_id: &str,
    ) -> NodeResult<HashMap<String, u128>>;

    async fn request_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt>;

    async fn rescind_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt>;

    async fn transfer(&self, session: &SessionHandle, params: &TransferParams) -> NodeResult<NodeReceipt>;

    /// Withdraws from the channel; the node produces and submits the on-chain transaction.
    async fn withdraw(&self, session: &SessionHandle, params: &WithdrawParams) -> NodeResult<NodeReceipt>;
}
