//! Chain Client capability
//!
//! The orchestration components only need native balances and value
//! transfers from a chain. `EvmClient` provides both over JSON-RPC; tests
//! substitute in-memory chains.

use anyhow::Result;
use async_trait::async_trait;
use chain_clients_evm::{parse_quantity, EvmClient, EvmWallet, TransactionRequest};
use serde::Serialize;

/// Confirmation of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Per-chain access used by the balance verifier and deposit coordinator.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Native balance of `address` in base units.
    async fn get_balance(&self, address: &str) -> Result<u128>;

    /// Signs `tx` with `wallet`, submits it and waits for a successful receipt.
    async fn send_transaction(&self, wallet: &EvmWallet, tx: &TransactionRequest) -> Result<TxReceipt>;
}

#[async_trait]
impl ChainClient for EvmClient {
    fn chain_id(&self) -> u64 {
        EvmClient::chain_id(self)
    }

    async fn get_balance(&self, address: &str) -> Result<u128> {
        EvmClient::get_balance(self, address).await
    }

    async fn send_transaction(&self, wallet: &EvmWallet, tx: &TransactionRequest) -> Result<TxReceipt> {
        let tx_hash = EvmClient::send_transaction(self, wallet, tx).await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;
        let block_number = receipt
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .and_then(|n| u64::try_from(n).ok());

        Ok(TxReceipt {
            tx_hash,
            block_number,
        })
    }
}
