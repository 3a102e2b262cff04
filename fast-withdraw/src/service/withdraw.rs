//! Withdrawal Finalizer
//!
//! Withdraws from a session to an on-chain address. The node produces and
//! submits the on-chain transaction.

use chain_clients_evm::normalize_address;
use serde::Serialize;
use tracing::info;

use crate::channel::{ChannelNodeError, ChannelSession, WithdrawParams};
use crate::error::{FlowError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalReceipt {
    pub withdrawal_id: String,
    /// Hash of the node-submitted transaction, when the node reports one
    pub tx_hash: Option<String>,
    pub chain_id: u64,
    pub recipient: String,
    pub amount: u128,
    pub asset_id: String,
}

#[derive(Debug, Default)]
pub struct WithdrawalFinalizer;

impl WithdrawalFinalizer {
    pub fn new() -> Self {
        Self
    }

    /// Withdraws `amount` of `asset_id` from `session` to `recipient`.
    ///
    /// # Returns
    ///
    /// * `Ok(WithdrawalReceipt)` - Node accepted and submitted the withdrawal
    /// * `Err(FlowError::InsufficientFreeBalance)` - Session cannot cover `amount`
    /// * `Err(FlowError::ChainSubmit)` - Invalid recipient, or the node failed to submit
    pub async fn withdraw(
        &self,
        session: &ChannelSession,
        amount: u128,
        asset_id: &str,
        recipient: &str,
    ) -> Result<WithdrawalReceipt> {
        let chain_id = session.chain_id();
        if amount == 0 {
            return Err(FlowError::InvalidInput("withdrawal amount must be positive".to_string()));
        }
        let asset_id = normalize_address(asset_id)
            .map_err(|e| FlowError::InvalidInput(format!("asset id: {:#}", e)))?;
        let recipient = normalize_address(recipient).map_err(|e| FlowError::ChainSubmit {
            chain_id,
            reason: format!("invalid withdrawal recipient: {:#}", e),
        })?;

        let session_id = session.public_identifier().to_string();
        let available = session
            .free_balance_of(session.signer_address(), &asset_id)
            .await
            .map_err(|e| FlowError::Query {
                chain_id,
                reason: format!("free balance of {}: {:#}", session.signer_address(), e),
            })?;
        if available < amount {
            return Err(FlowError::InsufficientFreeBalance {
                session: session_id,
                required: amount,
                detail: format!("available {}", available),
            });
        }

        let params = WithdrawParams {
            recipient: recipient.clone(),
            amount,
            asset_id: asset_id.clone(),
        };
        info!(session = %session_id, chain_id, %recipient, amount = %amount, "Submitting withdrawal");

        let receipt = session.withdraw(&params).await.map_err(|e| match e {
            ChannelNodeError::InsufficientFunds(reason) => FlowError::InsufficientFreeBalance {
                session: session_id.clone(),
                required: amount,
                detail: reason,
            },
            other => FlowError::ChainSubmit {
                chain_id,
                reason: format!("withdrawal failed: {:#}", other),
            },
        })?;
        info!(withdrawal_id = %receipt.id, tx_hash = ?receipt.tx_hash, "Withdrawal submitted");

        Ok(WithdrawalReceipt {
            withdrawal_id: receipt.id,
            tx_hash: receipt.tx_hash,
            chain_id,
            recipient,
            amount,
            asset_id,
        })
    }
}
