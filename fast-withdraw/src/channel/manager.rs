//! Channel Session Manager
//!
//! Opens one channel session per chain. Opens run concurrently; the result
//! keeps input order and any failure fails the whole batch.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chain_clients_evm::{normalize_address, EvmWallet};
use futures::future::try_join_all;
use tracing::{debug, info};

use super::{ChainRole, ChannelNode, ChannelSession, ConnectParams, SessionHandle, SessionRecord, SessionStore};
use crate::config::ChainConfig;
use crate::error::{FlowError, Result};

/// Identity and chain for one session to open.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub role: ChainRole,
    pub identity: EvmWallet,
    pub chain: ChainConfig,
}

/// Message a session identity signs to authenticate its connect request.
pub fn connect_message(chain_id: u64, signer_address: &str) -> String {
    format!("fast-withdraw connect:{}:{}", chain_id, signer_address.to_lowercase())
}

pub struct ChannelSessionManager {
    node: Arc<dyn ChannelNode>,
    store: SessionStore,
}

impl ChannelSessionManager {
    pub fn new(node: Arc<dyn ChannelNode>, store: SessionStore) -> Self {
        Self { node, store }
    }

    /// Opens a session for every request.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ChannelSession>)` - One session per request, in input order
    /// * `Err(FlowError::SessionOpen)` - The first open that failed; no session is returned
    /// * `Err(FlowError::InvalidInput)` - Two requests target the same chain
    pub async fn open(&self, requests: Vec<SessionRequest>) -> Result<Vec<ChannelSession>> {
        let mut chains = HashSet::new();
        for request in &requests {
            if !chains.insert(request.chain.chain_id) {
                return Err(FlowError::InvalidInput(format!(
                    "more than one session requested for chain {}",
                    request.chain.chain_id
                )));
            }
        }

        try_join_all(requests.into_iter().map(|request| self.open_one(request))).await
    }

    async fn open_one(&self, request: SessionRequest) -> Result<ChannelSession> {
        let chain_id = request.chain.chain_id;
        debug!(role = %request.role, chain_id, signer = request.identity.address(), "Opening channel session");

        let handle = self
            .connect(&request)
            .await
            .map_err(|e| FlowError::SessionOpen {
                chain_id,
                reason: format!("{:#}", e),
            })?;

        info!(
            role = %request.role,
            chain = %request.chain.name,
            chain_id,
            signer = %handle.signer_address,
            multisig = %handle.multisig_address,
            public_identifier = %handle.public_identifier,
            "Channel session open"
        );

        Ok(ChannelSession::new(
            request.role,
            chain_id,
            request.identity,
            handle,
            Arc::clone(&self.node),
        ))
    }

    async fn connect(&self, request: &SessionRequest) -> anyhow::Result<SessionHandle> {
        let chain_id = request.chain.chain_id;
        let signer = request.identity.address();

        let resume = self
            .store
            .load(signer, chain_id)
            .await?
            .map(|record| record.handle);
        if let Some(previous) = &resume {
            debug!(chain_id, multisig = %previous.multisig_address, "Resuming stored session");
        }

        let signature = request
            .identity
            .sign_message(connect_message(chain_id, signer).as_bytes())
            .context("Failed to sign connect request")?;

        let params = ConnectParams {
            signer_address: signer.to_string(),
            chain_id,
            eth_provider_url: request.chain.rpc_url.clone(),
            signature: format!("0x{}", hex::encode(signature)),
            resume,
        };
        let handle = self.node.connect(&params).await?;
        let handle = validate_handle(handle, signer)?;

        self.store
            .save(&SessionRecord {
                chain_id,
                handle: handle.clone(),
            })
            .await?;

        Ok(handle)
    }
}

/// Checks a node answer before the flow relies on it.
fn validate_handle(handle: SessionHandle, expected_signer: &str) -> anyhow::Result<SessionHandle> {
    let signer = normalize_address(&handle.signer_address).context("Node returned an invalid signer address")?;
    if signer != expected_signer.to_lowercase() {
        anyhow::bail!(
            "Node opened the session for signer {}, expected {}",
            signer,
            expected_signer
        );
    }
    let multisig =
        normalize_address(&handle.multisig_address).context("Node returned an invalid multisig address")?;
    if handle.public_identifier.trim().is_empty() {
        anyhow::bail!("Node returned an empty public identifier");
    }

    Ok(SessionHandle {
        signer_address: signer,
        multisig_address: multisig,
        public_identifier: handle.public_identifier,
    })
}
