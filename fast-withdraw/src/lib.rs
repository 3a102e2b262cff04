//! Fast withdraw orchestrator
//!
//! Moves value from a payment-channel session on a child chain to a session
//! on a parent chain and withdraws it there, using identities derived from
//! one root key.

pub mod chain;
pub mod channel;
pub mod config;
pub mod error;
pub mod identity;
pub mod service;

// Re-export public types for convenience
pub use chain::{ChainClient, TxReceipt};
pub use channel::{
    ChainRole, ChannelNode, ChannelNodeError, ChannelSession, ChannelSessionManager, DepositRightsRegistry,
    HttpChannelNode, SessionHandle, SessionRequest, SessionStore,
};
pub use config::{ChainConfig, FastWithdrawConfig};
pub use error::FlowError;
pub use identity::{derive, DerivedIdentity, RootIdentity};
pub use service::{
    BalanceSnapshot, BalanceVerifier, ChainEndpoint, DepositCoordinator, FastWithdrawFlow, FlowFailure,
    FlowReport, FlowSettings, FlowState, TransferRouter, WithdrawalFinalizer,
};
