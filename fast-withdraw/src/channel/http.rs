//! Channel Node HTTP Client
//!
//! JSON-over-HTTP adapter for a channel node. Status codes on unsuccessful
//! responses are classified into `ChannelNodeError` variants; everything
//! else (connection failures, unparsable bodies) is a transport failure.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ChannelNode, ChannelNodeError, ConnectParams, NodeReceipt, NodeResult, SessionHandle, TransferParams,
    WithdrawParams,
};

// ============================================================================
// API RESPONSE WRAPPER
// ============================================================================

/// Standardized response structure from the channel node.
///
/// ```json
/// {
///   "success": true|false,
///   "data": <payload>|null,
///   "error": <message>|null
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetRequest<'a> {
    asset_id: &'a str,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct HttpChannelNode {
    /// Base URL of the channel node (e.g., "http://127.0.0.1:8080")
    base_url: String,
    client: reqwest::Client,
}

impl HttpChannelNode {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn channel_url(&self, session: &SessionHandle, path: &str) -> String {
        format!("{}/channels/{}/{}", self.base_url, session.public_identifier, path)
    }

    /// Sends a request and unwraps the response envelope.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, endpoint: &str) -> NodeResult<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", endpoint))?;

        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response (HTTP {})", endpoint, status))?;

        if !body.success || !status.is_success() {
            let reason = body
                .error
                .unwrap_or_else(|| format!("HTTP {} without error message", status));
            debug!(endpoint, %status, %reason, "Channel node refused request");
            return Err(match status {
                StatusCode::CONFLICT => ChannelNodeError::DepositRightsHeld(reason),
                StatusCode::PAYMENT_REQUIRED => ChannelNodeError::InsufficientFunds(reason),
                _ => ChannelNodeError::Rejected(reason),
            });
        }

        body.data.ok_or_else(|| {
            ChannelNodeError::Transport(anyhow::anyhow!(
                "Missing data in successful {} response",
                endpoint
            ))
        })
    }
}

#[async_trait]
impl ChannelNode for HttpChannelNode {
    async fn connect(&self, params: &ConnectParams) -> NodeResult<SessionHandle> {
        let url = format!("{}/channels/connect", self.base_url);
        self.send(self.client.post(&url).json(params), "POST /channels/connect")
            .await
    }

    async fn get_free_balance(
        &self,
        session: &SessionHandle,
        asset_id: &str,
    ) -> NodeResult<HashMap<String, u128>> {
        let url = self.channel_url(session, &format!("free-balance/{}", asset_id));
        let raw: HashMap<String, String> = self
            .send(self.client.get(&url), "GET /channels/:id/free-balance/:asset")
            .await?;

        raw.into_iter()
            .map(|(address, amount)| -> NodeResult<(String, u128)> {
                let value = amount
                    .trim()
                    .parse::<u128>()
                    .with_context(|| format!("Invalid free balance '{}' for {}", amount, address))?;
                Ok((address.to_lowercase(), value))
            })
            .collect()
    }

    async fn request_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt> {
        let url = self.channel_url(session, "deposit-rights");
        self.send(
            self.client.post(&url).json(&AssetRequest { asset_id }),
            "POST /channels/:id/deposit-rights",
        )
        .await
    }

    async fn rescind_deposit_rights(&self, session: &SessionHandle, asset_id: &str) -> NodeResult<NodeReceipt> {
        let url = self.channel_url(session, "deposit-rights/rescind");
        self.send(
            self.client.post(&url).json(&AssetRequest { asset_id }),
            "POST /channels/:id/deposit-rights/rescind",
        )
        .await
    }

    async fn transfer(&self, session: &SessionHandle, params: &TransferParams) -> NodeResult<NodeReceipt> {
        let url = self.channel_url(session, "transfers");
        self.send(self.client.post(&url).json(params), "POST /channels/:id/transfers")
            .await
    }

    async fn withdraw(&self, session: &SessionHandle, params: &WithdrawParams) -> NodeResult<NodeReceipt> {
        let url = self.channel_url(session, "withdrawals");
        self.send(self.client.post(&url).json(params), "POST /channels/:id/withdrawals")
            .await
    }
}
