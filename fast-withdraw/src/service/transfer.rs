//! Transfer Router
//!
//! Single off-chain transfer from one session to another session's routing
//! identifier, tagged with the receiving chain and asset.

use chain_clients_evm::normalize_address;
use serde::Serialize;
use tracing::info;

use crate::channel::{ChannelNodeError, ChannelSession, TransferMeta, TransferParams};
use crate::error::{FlowError, Result};

/// A submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub amount: u128,
    pub asset_id: String,
    /// Routing identifier of the sending session
    pub sender: String,
    /// Routing identifier of the receiving session
    pub recipient: String,
    pub meta: TransferMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub transfer: Transfer,
}

#[derive(Debug, Default)]
pub struct TransferRouter;

impl TransferRouter {
    pub fn new() -> Self {
        Self
    }

    /// Transfers `amount` from `from` to the session behind `to_routing_identifier`.
    ///
    /// `receiver_asset_id` defaults to `asset_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - Transfer accepted by the node
    /// * `Err(FlowError::InsufficientFreeBalance)` - Sender cannot cover `amount`
    /// * `Err(FlowError::TransferRejected)` - Node refused the transfer
    pub async fn transfer(
        &self,
        amount: u128,
        asset_id: &str,
        from: &ChannelSession,
        to_routing_identifier: &str,
        receiver_chain_id: u64,
        receiver_asset_id: Option<&str>,
    ) -> Result<TransferReceipt> {
        if amount == 0 {
            return Err(FlowError::InvalidInput("transfer amount must be positive".to_string()));
        }
        if to_routing_identifier.trim().is_empty() {
            return Err(FlowError::InvalidInput("transfer recipient must not be empty".to_string()));
        }
        if to_routing_identifier == from.public_identifier() {
            return Err(FlowError::InvalidInput(format!(
                "session {} cannot transfer to itself",
                to_routing_identifier
            )));
        }
        let asset_id = normalize_address(asset_id)
            .map_err(|e| FlowError::InvalidInput(format!("asset id: {:#}", e)))?;
        let receiver_asset_id = match receiver_asset_id {
            Some(id) => normalize_address(id)
                .map_err(|e| FlowError::InvalidInput(format!("receiver asset id: {:#}", e)))?,
            None => asset_id.clone(),
        };

        let sender = from.public_identifier().to_string();
        let available = from
            .free_balance_of(from.signer_address(), &asset_id)
            .await
            .map_err(|e| FlowError::Query {
                chain_id: from.chain_id(),
                reason: format!("free balance of {}: {:#}", from.signer_address(), e),
            })?;
        if available < amount {
            return Err(FlowError::InsufficientFreeBalance {
                session: sender,
                required: amount,
                detail: format!("available {}", available),
            });
        }

        let params = TransferParams {
            recipient: to_routing_identifier.to_string(),
            amount,
            asset_id: asset_id.clone(),
            meta: TransferMeta {
                receiver_asset_id,
                receiver_chain_id,
            },
        };

        info!(
            from = %sender,
            to = to_routing_identifier,
            amount = %amount,
            %asset_id,
            receiver_chain_id,
            "Submitting transfer"
        );
        let receipt = from.transfer(&params).await.map_err(|e| match e {
            ChannelNodeError::InsufficientFunds(reason) => FlowError::InsufficientFreeBalance {
                session: sender.clone(),
                required: amount,
                detail: reason,
            },
            other => FlowError::TransferRejected {
                session: sender.clone(),
                reason: format!("{:#}", other),
            },
        })?;
        info!(transfer_id = %receipt.id, "Transfer accepted");

        Ok(TransferReceipt {
            transfer_id: receipt.id,
            transfer: Transfer {
                amount,
                asset_id,
                sender,
                recipient: params.recipient,
                meta: params.meta,
            },
        })
    }
}
