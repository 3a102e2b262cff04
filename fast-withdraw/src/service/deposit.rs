//! Deposit Coordinator
//!
//! Moves on-chain funds into a session's multisig. Each deposit runs
//! inside deposit rights for `(session, asset)`, held both in the local
//! registry and on the node:
//!
//! 1. Acquire local rights, then request node rights
//! 2. Submit the on-chain transfer to the multisig
//! 3. Rescind node rights (whatever step 2 returned), then drop local rights
//!
//! The coordinator does not wait for the node to credit the deposit; the
//! flow confirms that through the balance verifier.

use std::sync::Arc;

use chain_clients_evm::address::is_native_asset;
use chain_clients_evm::{normalize_address, EvmWallet, TransactionRequest};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chain::ChainClient;
use crate::channel::{ChannelNodeError, ChannelSession, DepositRightsRegistry};
use crate::error::{FlowError, Result};

/// Confirmation of a submitted deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    pub tx_hash: String,
    pub chain_id: u64,
    pub multisig_address: String,
    pub asset_id: String,
    pub amount: u128,
}

pub struct DepositCoordinator {
    rights: Arc<DepositRightsRegistry>,
}

impl DepositCoordinator {
    pub fn new(rights: Arc<DepositRightsRegistry>) -> Self {
        Self { rights }
    }

    /// Deposits `amount` of `asset_id` from `depositor` into `session`.
    ///
    /// # Arguments
    ///
    /// * `depositor` - On-chain identity paying for the deposit
    /// * `chain` - Client for the session's chain
    /// * `session` - Session receiving the deposit
    /// * `asset_id` - Zero address for the native asset, else an ERC-20 token
    /// * `amount` - Base units, must be positive
    ///
    /// # Returns
    ///
    /// * `Ok(DepositReceipt)` - Transaction included on chain
    /// * `Err(FlowError::RightsConflict)` - Rights for the pair are held elsewhere
    /// * `Err(FlowError::ChainSubmit)` - Submission failed, or rights could not be rescinded
    pub async fn deposit(
        &self,
        depositor: &EvmWallet,
        chain: &dyn ChainClient,
        session: &ChannelSession,
        asset_id: &str,
        amount: u128,
    ) -> Result<DepositReceipt> {
        if amount == 0 {
            return Err(FlowError::InvalidInput("deposit amount must be positive".to_string()));
        }
        let asset_id = normalize_address(asset_id)
            .map_err(|e| FlowError::InvalidInput(format!("asset id: {:#}", e)))?;
        let chain_id = chain.chain_id();
        if chain_id != session.chain_id() {
            return Err(FlowError::InvalidInput(format!(
                "session on chain {} cannot receive a deposit on chain {}",
                session.chain_id(),
                chain_id
            )));
        }
        let tx = if is_native_asset(&asset_id) {
            TransactionRequest::transfer(session.multisig_address(), amount)
        } else {
            TransactionRequest::erc20_transfer(&asset_id, session.multisig_address(), amount)
                .map_err(|e| FlowError::InvalidInput(format!("{:#}", e)))?
        };

        let _local_rights = self.rights.try_acquire(session.public_identifier(), &asset_id)?;

        match session.request_deposit_rights(&asset_id).await {
            Ok(receipt) => debug!(rights_id = %receipt.id, "Deposit rights granted by node"),
            Err(ChannelNodeError::DepositRightsHeld(reason)) => {
                warn!(session = session.public_identifier(), %asset_id, %reason, "Deposit rights held");
                return Err(FlowError::RightsConflict {
                    session: session.public_identifier().to_string(),
                    asset_id,
                });
            }
            Err(e) => {
                // The node may have granted rights before the failure surfaced.
                self.rescind(session, &asset_id).await.ok();
                return Err(FlowError::ChainSubmit {
                    chain_id,
                    reason: format!("deposit rights request failed: {:#}", e),
                });
            }
        }

        info!(
            chain_id,
            from = depositor.address(),
            multisig = session.multisig_address(),
            %asset_id,
            amount = %amount,
            "Submitting deposit"
        );
        let submitted = chain.send_transaction(depositor, &tx).await;
        let rescinded = self.rescind(session, &asset_id).await;

        match (submitted, rescinded) {
            (Err(e), _) => Err(FlowError::ChainSubmit {
                chain_id,
                reason: format!("deposit transaction failed: {:#}", e),
            }),
            (Ok(receipt), Err(e)) => Err(FlowError::ChainSubmit {
                chain_id,
                reason: format!(
                    "deposit {} included but deposit rights could not be rescinded: {:#}",
                    receipt.tx_hash, e
                ),
            }),
            (Ok(receipt), Ok(())) => {
                info!(chain_id, tx_hash = %receipt.tx_hash, amount = %amount, "Deposit included");
                Ok(DepositReceipt {
                    tx_hash: receipt.tx_hash,
                    chain_id,
                    multisig_address: session.multisig_address().to_string(),
                    asset_id,
                    amount,
                })
            }
        }
    }

    async fn rescind(&self, session: &ChannelSession, asset_id: &str) -> std::result::Result<(), ChannelNodeError> {
        session
            .rescind_deposit_rights(asset_id)
            .await
            .map(|_| debug!(session = session.public_identifier(), asset_id, "Deposit rights rescinded"))
            .map_err(|e| {
                error!(
                    session = session.public_identifier(),
                    asset_id,
                    error = %e,
                    "Failed to rescind deposit rights"
                );
                e
            })
    }
}
