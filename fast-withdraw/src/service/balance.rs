//! Balance Verifier
//!
//! Reads channel free balances and on-chain balances. Nothing is cached:
//! every snapshot is a fresh read, and `wait_until` polls fresh snapshots
//! until a post-condition holds.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::chain::ChainClient;
use crate::channel::ChannelSession;
use crate::error::{FlowError, Result};

/// Balances of one address on one chain at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub address: String,
    pub chain_id: u64,
    /// Free balance in the session, when a session was given
    pub channel_free_balance: Option<u128>,
    pub on_chain_balance: u128,
}

impl BalanceSnapshot {
    /// Channel free balance, zero when no session was read.
    pub fn free_balance(&self) -> u128 {
        self.channel_free_balance.unwrap_or(0)
    }
}

pub struct BalanceVerifier {
    asset_id: String,
    poll_interval: Duration,
}

impl BalanceVerifier {
    /// # Arguments
    ///
    /// * `asset_id` - Asset whose channel free balance is read
    /// * `poll_interval` - Delay between snapshots in `wait_until`
    pub fn new(asset_id: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            asset_id: asset_id.into(),
            poll_interval,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Takes a fresh snapshot of `address` on `chain`.
    ///
    /// # Returns
    ///
    /// * `Ok(BalanceSnapshot)` - Current balances
    /// * `Err(FlowError::Query)` - Chain or node read failed
    /// * `Err(FlowError::InvalidInput)` - `session` belongs to another chain
    pub async fn snapshot(
        &self,
        address: &str,
        chain: &dyn ChainClient,
        session: Option<&ChannelSession>,
    ) -> Result<BalanceSnapshot> {
        let chain_id = chain.chain_id();

        let channel_free_balance = match session {
            Some(session) if session.chain_id() != chain_id => {
                return Err(FlowError::InvalidInput(format!(
                    "session on chain {} cannot be read through chain {}",
                    session.chain_id(),
                    chain_id
                )));
            }
            Some(session) => Some(
                session
                    .free_balance_of(address, &self.asset_id)
                    .await
                    .map_err(|e| FlowError::Query {
                        chain_id,
                        reason: format!("free balance of {}: {:#}", address, e),
                    })?,
            ),
            None => None,
        };

        let on_chain_balance = chain
            .get_balance(address)
            .await
            .map_err(|e| FlowError::Query {
                chain_id,
                reason: format!("on-chain balance of {}: {:#}", address, e),
            })?;

        Ok(BalanceSnapshot {
            address: address.to_string(),
            chain_id,
            channel_free_balance,
            on_chain_balance,
        })
    }

    /// Polls snapshots until `condition` holds.
    ///
    /// A query failure aborts immediately; only an unmet condition is retried.
    ///
    /// # Returns
    ///
    /// * `Ok(BalanceSnapshot)` - First snapshot satisfying `condition`
    /// * `Err(FlowError::ConfirmationTimeout)` - `timeout` elapsed first
    pub async fn wait_until<F>(
        &self,
        address: &str,
        chain: &dyn ChainClient,
        session: Option<&ChannelSession>,
        timeout: Duration,
        condition: F,
    ) -> Result<BalanceSnapshot>
    where
        F: Fn(&BalanceSnapshot) -> bool + Send,
    {
        let deadline = Instant::now() + timeout;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let snapshot = self.snapshot(address, chain, session).await?;
            if condition(&snapshot) {
                return Ok(snapshot);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FlowError::ConfirmationTimeout {
                    chain_id: chain.chain_id(),
                    waited: timeout,
                });
            }

            debug!(
                address,
                chain_id = snapshot.chain_id,
                attempt,
                free_balance = ?snapshot.channel_free_balance,
                on_chain_balance = %snapshot.on_chain_balance,
                "Balance condition not met yet"
            );
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
