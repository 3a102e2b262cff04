//! Fast withdraw services
//!
//! The balance verifier, the three value-moving steps, and the flow that
//! sequences them.

pub mod balance;
pub mod deposit;
pub mod flow;
pub mod transfer;
pub mod withdraw;

// Re-export for convenience
pub use balance::{BalanceSnapshot, BalanceVerifier};
pub use deposit::{DepositCoordinator, DepositReceipt};
pub use flow::{
    ChainEndpoint, FastWithdrawFlow, FlowFailure, FlowReport, FlowSettings, FlowState, RecordedSnapshot,
    SessionSummary,
};
pub use transfer::{Transfer, TransferReceipt, TransferRouter};
pub use withdraw::{WithdrawalFinalizer, WithdrawalReceipt};
