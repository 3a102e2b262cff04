//! Error taxonomy for the fast withdraw flow
//!
//! Every variant is fatal to a run. Adapter-level failures (`anyhow::Error`,
//! `ChannelNodeError`) are classified into these variants at the component
//! boundary, keeping the full context chain in the `reason` text.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the orchestration components.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The identity cannot produce a signature (no key loaded, invalid key material).
    #[error("signing failed: {reason}")]
    Signing { reason: String },

    /// A channel session could not be opened; no session from the batch is returned.
    #[error("failed to open channel session on chain {chain_id}: {reason}")]
    SessionOpen { chain_id: u64, reason: String },

    /// A balance read against the chain or the channel node failed.
    #[error("balance query on chain {chain_id} failed: {reason}")]
    Query { chain_id: u64, reason: String },

    /// Deposit rights for the pair are already held by another depositor.
    #[error("deposit rights for asset {asset_id} in session {session} are held by another deposit")]
    RightsConflict { session: String, asset_id: String },

    /// An on-chain submission (deposit or withdrawal) failed.
    #[error("chain submission on chain {chain_id} failed: {reason}")]
    ChainSubmit { chain_id: u64, reason: String },

    /// The session's free balance does not cover the transfer or withdrawal amount.
    #[error("insufficient free balance in session {session}: required {required}, {detail}")]
    InsufficientFreeBalance {
        session: String,
        required: u128,
        detail: String,
    },

    /// The channel node refused an off-chain transfer.
    #[error("transfer from session {session} rejected: {reason}")]
    TransferRejected { session: String, reason: String },

    /// A post-condition was not observed before the confirmation timeout.
    #[error("expected balance change on chain {chain_id} not observed within {waited:?}")]
    ConfirmationTimeout { chain_id: u64, waited: Duration },

    /// Caller-supplied input failed validation before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T, E = FlowError> = std::result::Result<T, E>;
