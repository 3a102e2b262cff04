//! EVM JSON-RPC client
//!
//! Queries balances and submits locally-signed legacy transactions via
//! `eth_sendRawTransaction`. Works with public RPCs that don't hold keys.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::address::{address_bytes, normalize_address};
use crate::transaction::LegacyTransaction;
use crate::units::{parse_quantity, to_quantity};
use crate::wallet::{keccak256, EvmWallet};

/// Gas limit used when `eth_estimateGas` fails for a plain value transfer.
const FALLBACK_TRANSFER_GAS: u64 = 21_000;
/// Gas limit used when `eth_estimateGas` fails for a contract call.
const FALLBACK_CALL_GAS: u64 = 100_000;

/// Transaction the caller wants executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Recipient or contract address
    pub to: String,
    /// Value in wei
    pub value: u128,
    /// Calldata (empty for plain value transfers)
    pub data: Vec<u8>,
}

impl TransactionRequest {
    /// Plain native-currency transfer.
    pub fn transfer(to: impl Into<String>, value: u128) -> Self {
        Self {
            to: to.into(),
            value,
            data: Vec::new(),
        }
    }

    /// ERC-20 `transfer(address,uint256)` call on `token`.
    ///
    /// Calldata: selector (4 bytes) + recipient (32 bytes) + amount (32 bytes).
    pub fn erc20_transfer(token: &str, recipient: &str, amount: u128) -> Result<Self> {
        let selector = &keccak256(b"transfer(address,uint256)")[..4];
        let recipient_bytes = address_bytes(recipient).context("Invalid ERC-20 recipient")?;

        let mut data = Vec::with_capacity(68);
        data.extend_from_slice(selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&recipient_bytes);
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&amount.to_be_bytes());

        Ok(Self {
            to: normalize_address(token)?,
            value: 0,
            data,
        })
    }
}

/// Subset of the JSON-RPC transaction receipt that callers inspect.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    /// "0x1" = success, "0x0" = reverted
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// Client for an EVM chain reachable over JSON-RPC.
#[derive(Debug, Clone)]
pub struct EvmClient {
    /// HTTP client for JSON-RPC calls
    client: Client,
    /// RPC endpoint URL
    base_url: String,
    /// Chain ID used for EIP-155 signing
    chain_id: u64,
    /// How many times to poll for a receipt before giving up
    receipt_attempts: u32,
    /// Delay between receipt polls
    receipt_interval: Duration,
}

impl EvmClient {
    /// Creates a new EVM client
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - JSON-RPC endpoint
    /// * `chain_id` - Chain ID of the network behind `rpc_url`
    ///
    /// # Returns
    ///
    /// * `Ok(EvmClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to create HTTP client
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: rpc_url.to_string(),
            chain_id,
            receipt_attempts: 60,
            receipt_interval: Duration::from_millis(1000),
        })
    }

    /// Overrides receipt polling (attempts x interval).
    pub fn with_receipt_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.receipt_attempts = attempts;
        self.receipt_interval = interval;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.base_url
    }

    /// Native balance of `address` at the latest block, in wei.
    pub async fn get_balance(&self, address: &str) -> Result<u128> {
        let address = normalize_address(address)?;
        let balance_hex: String = self
            .json_rpc(
                "eth_getBalance",
                vec![serde_json::json!(address), serde_json::json!("latest")],
            )
            .await
            .context("eth_getBalance failed")?;
        parse_quantity(&balance_hex)
    }

    /// Pending nonce of `address`.
    pub async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let nonce_hex: String = self
            .json_rpc(
                "eth_getTransactionCount",
                vec![serde_json::json!(address), serde_json::json!("pending")],
            )
            .await
            .context("eth_getTransactionCount failed")?;
        let nonce = parse_quantity(&nonce_hex)?;
        u64::try_from(nonce).context("Nonce does not fit in u64")
    }

    pub async fn gas_price(&self) -> Result<u128> {
        let gas_price_hex: String = self
            .json_rpc("eth_gasPrice", vec![])
            .await
            .context("eth_gasPrice failed")?;
        parse_quantity(&gas_price_hex)
    }

    /// Estimates gas for `tx`, falling back to a fixed limit when the node
    /// refuses to estimate.
    pub async fn estimate_gas(&self, from: &str, tx: &TransactionRequest) -> Result<u64> {
        let call = serde_json::json!({
            "from": from,
            "to": tx.to,
            "value": to_quantity(tx.value),
            "data": format!("0x{}", hex::encode(&tx.data)),
        });

        match self.json_rpc::<String>("eth_estimateGas", vec![call]).await {
            Ok(gas_hex) => {
                let gas = parse_quantity(&gas_hex)?;
                u64::try_from(gas).context("Gas estimate does not fit in u64")
            }
            Err(e) => {
                let fallback = if tx.data.is_empty() {
                    FALLBACK_TRANSFER_GAS
                } else {
                    FALLBACK_CALL_GAS
                };
                warn!(error = %e, fallback, "eth_estimateGas failed, using fallback gas limit");
                Ok(fallback)
            }
        }
    }

    /// Signs `tx` with `wallet` and broadcasts it.
    ///
    /// Builds a legacy (pre-EIP-1559) transaction and sends it via
    /// eth_sendRawTransaction.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Transaction hash
    /// * `Err(anyhow::Error)` - Failed to build, sign or broadcast
    pub async fn send_transaction(&self, wallet: &EvmWallet, tx: &TransactionRequest) -> Result<String> {
        let nonce = self.get_transaction_count(wallet.address()).await?;
        let gas_price = self.gas_price().await?;
        let gas_limit = self.estimate_gas(wallet.address(), tx).await?;

        let legacy = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: normalize_address(&tx.to)?,
            value: tx.value,
            data: tx.data.clone(),
            chain_id: self.chain_id,
        };
        let raw_tx = format!("0x{}", hex::encode(legacy.sign(wallet)?));

        debug!(
            "EVM raw tx: nonce={}, gas_price={}, gas_limit={}, chain_id={}, from={}",
            nonce,
            gas_price,
            gas_limit,
            self.chain_id,
            wallet.address()
        );

        let tx_hash: String = self
            .json_rpc("eth_sendRawTransaction", vec![serde_json::json!(raw_tx)])
            .await
            .context("eth_sendRawTransaction failed")?;

        info!(chain_id = self.chain_id, tx_hash = %tx_hash, to = %tx.to, "Submitted EVM transaction");
        Ok(tx_hash)
    }

    /// Fetches the receipt for `tx_hash`, `None` while the transaction is pending.
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        self.json_rpc(
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
        .context("eth_getTransactionReceipt failed")
    }

    /// Waits for an EVM transaction receipt and verifies success.
    pub async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt> {
        for _ in 0..self.receipt_attempts {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                if receipt.succeeded() {
                    return Ok(receipt);
                }
                anyhow::bail!(
                    "EVM transaction {} failed with status: {}",
                    tx_hash,
                    receipt.status.as_deref().unwrap_or("unknown")
                );
            }
            tokio::time::sleep(self.receipt_interval).await;
        }

        anyhow::bail!("Timed out waiting for EVM transaction receipt: {}", tx_hash)
    }

    /// Generic EVM JSON-RPC call helper.
    async fn json_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response: serde_json::Value = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, self.base_url))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response from {}", method, self.base_url))?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.base_url,
                method,
                message,
                code
            );
        }

        let result = response
            .get("result")
            .ok_or_else(|| anyhow::anyhow!("No result in {} response", method))?;

        serde_json::from_value(result.clone())
            .with_context(|| format!("Failed to deserialize {} result", method))
    }
}
