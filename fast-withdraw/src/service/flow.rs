//! Fast withdraw flow
//!
//! Drives one run of the state machine:
//!
//! ```text
//! Idle -> SessionsOpen -> Deposited -> Transferred -> Withdrawn -> Done
//!   \__________\_____________\____________\______________\-> Failed
//! ```
//!
//! Each transition is gated by a balance snapshot confirming the effect of
//! the previous step. There is no retry and no rollback: the first failure
//! ends the run and the caller gets the last reached state with the error.

use std::sync::Arc;
use std::time::Duration;

use chain_clients_evm::{format_ether, normalize_address, EvmWallet};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use super::balance::{BalanceSnapshot, BalanceVerifier};
use super::deposit::{DepositCoordinator, DepositReceipt};
use super::transfer::{TransferReceipt, TransferRouter};
use super::withdraw::{WithdrawalFinalizer, WithdrawalReceipt};
use crate::chain::ChainClient;
use crate::channel::{ChainRole, ChannelSession, ChannelSessionManager, DepositRightsRegistry, SessionRequest};
use crate::config::{ChainConfig, FastWithdrawConfig};
use crate::error::{FlowError, Result};
use crate::identity::{derive, RootIdentity};

/// Position of a run in the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowState {
    Idle,
    SessionsOpen,
    Deposited,
    Transferred,
    Withdrawn,
    Done,
    Failed,
}

/// Run parameters.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub amount: u128,
    pub asset_id: String,
    pub child_label: String,
    pub parent_label: String,
    pub parent_uses_root: bool,
    /// Defaults to the root address
    pub withdraw_recipient: Option<String>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl FlowSettings {
    pub fn from_config(config: &FastWithdrawConfig) -> anyhow::Result<Self> {
        Ok(Self {
            amount: config.amount_wei()?,
            asset_id: normalize_address(&config.transfer.asset_id)?,
            child_label: config.identity.child_label.clone(),
            parent_label: config.identity.parent_label.clone(),
            parent_uses_root: config.identity.parent_uses_root,
            withdraw_recipient: config.transfer.withdraw_recipient.clone(),
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        })
    }
}

/// A chain's configuration together with its client.
#[derive(Clone)]
pub struct ChainEndpoint {
    pub config: ChainConfig,
    pub client: Arc<dyn ChainClient>,
}

impl ChainEndpoint {
    pub fn new(config: ChainConfig, client: Arc<dyn ChainClient>) -> Self {
        Self { config, client }
    }
}

/// Opened session as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub role: ChainRole,
    pub chain_id: u64,
    pub signer_address: String,
    pub multisig_address: String,
    pub public_identifier: String,
}

impl From<&ChannelSession> for SessionSummary {
    fn from(session: &ChannelSession) -> Self {
        Self {
            role: session.role(),
            chain_id: session.chain_id(),
            signer_address: session.signer_address().to_string(),
            multisig_address: session.multisig_address().to_string(),
            public_identifier: session.public_identifier().to_string(),
        }
    }
}

/// Snapshot taken at a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedSnapshot {
    /// State the flow was in when the snapshot was taken
    pub stage: FlowState,
    /// Whose balance was read ("child", "parent", "root", "recipient")
    pub subject: String,
    pub snapshot: BalanceSnapshot,
}

/// Everything a run produced, up to where it stopped.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub final_state: FlowState,
    pub root_address: String,
    pub amount: u128,
    pub asset_id: String,
    pub sessions: Vec<SessionSummary>,
    pub deposit: Option<DepositReceipt>,
    pub transfer: Option<TransferReceipt>,
    pub withdrawal: Option<WithdrawalReceipt>,
    pub snapshots: Vec<RecordedSnapshot>,
}

impl FlowReport {
    fn new(root_address: &str, settings: &FlowSettings) -> Self {
        Self {
            final_state: FlowState::Idle,
            root_address: root_address.to_string(),
            amount: settings.amount,
            asset_id: settings.asset_id.clone(),
            sessions: Vec::new(),
            deposit: None,
            transfer: None,
            withdrawal: None,
            snapshots: Vec::new(),
        }
    }
}

/// A failed run: the last state reached before the error.
#[derive(Debug, Error)]
#[error("fast withdraw failed after reaching {last_state:?}: {error}")]
pub struct FlowFailure {
    pub last_state: FlowState,
    #[source]
    pub error: FlowError,
    pub report: FlowReport,
}

pub struct FastWithdrawFlow {
    settings: FlowSettings,
    root: RootIdentity,
    child: ChainEndpoint,
    parent: ChainEndpoint,
    sessions: ChannelSessionManager,
    balances: BalanceVerifier,
    deposits: DepositCoordinator,
    router: TransferRouter,
    finalizer: WithdrawalFinalizer,
    state: FlowState,
}

impl FastWithdrawFlow {
    pub fn new(
        settings: FlowSettings,
        root: RootIdentity,
        child: ChainEndpoint,
        parent: ChainEndpoint,
        sessions: ChannelSessionManager,
        rights: Arc<DepositRightsRegistry>,
    ) -> Self {
        let balances = BalanceVerifier::new(settings.asset_id.clone(), settings.poll_interval);
        Self {
            settings,
            root,
            child,
            parent,
            sessions,
            balances,
            deposits: DepositCoordinator::new(rights),
            router: TransferRouter::new(),
            finalizer: WithdrawalFinalizer::new(),
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Runs the flow once.
    ///
    /// # Returns
    ///
    /// * `Ok(FlowReport)` - Run reached `Done`
    /// * `Err(FlowFailure)` - Run stopped; carries the last reached state and the partial report
    pub async fn run(&mut self) -> std::result::Result<FlowReport, FlowFailure> {
        self.state = FlowState::Idle;
        let mut report = FlowReport::new(self.root.address(), &self.settings);

        match self.execute(&mut report).await {
            Ok(()) => {
                self.advance(FlowState::Done, &mut report);
                Ok(report)
            }
            Err(error) => {
                let last_state = self.state;
                error!(last_state = ?last_state, error = %error, "Fast withdraw failed");
                self.state = FlowState::Failed;
                report.final_state = FlowState::Failed;
                Err(FlowFailure {
                    last_state,
                    error,
                    report,
                })
            }
        }
    }

    fn advance(&mut self, next: FlowState, report: &mut FlowReport) {
        info!(from = ?self.state, to = ?next, "Flow state transition");
        self.state = next;
        report.final_state = next;
    }

    fn parent_identity(&self) -> Result<EvmWallet> {
        if self.settings.parent_uses_root {
            return Ok(self.root.signer()?.clone());
        }
        Ok(derive(&self.root, &self.settings.parent_label)?.into_wallet())
    }

    async fn execute(&mut self, report: &mut FlowReport) -> Result<()> {
        let amount = self.settings.amount;
        let asset_id = self.settings.asset_id.clone();
        let timeout = self.settings.confirmation_timeout;
        let recipient = match &self.settings.withdraw_recipient {
            Some(address) => normalize_address(address)
                .map_err(|e| FlowError::InvalidInput(format!("withdraw recipient: {:#}", e)))?,
            None => self.root.address().to_string(),
        };

        info!(
            root = self.root.address(),
            amount = %amount,
            ether = %format_ether(amount),
            %asset_id,
            child_chain_id = self.child.config.chain_id,
            parent_chain_id = self.parent.config.chain_id,
            "Starting fast withdraw"
        );

        // Identities and sessions
        let child_identity = derive(&self.root, &self.settings.child_label)?.into_wallet();
        let parent_identity = self.parent_identity()?;
        let opened = self
            .sessions
            .open(vec![
                SessionRequest {
                    role: ChainRole::Child,
                    identity: child_identity,
                    chain: self.child.config.clone(),
                },
                SessionRequest {
                    role: ChainRole::Parent,
                    identity: parent_identity,
                    chain: self.parent.config.clone(),
                },
            ])
            .await?;
        let [child_session, parent_session]: [ChannelSession; 2] = opened.try_into().map_err(|v: Vec<_>| {
            FlowError::InvalidInput(format!("expected 2 sessions, got {}", v.len()))
        })?;
        report.sessions = vec![(&child_session).into(), (&parent_session).into()];

        let child_chain = Arc::clone(&self.child.client);
        let parent_chain = Arc::clone(&self.parent.client);

        let child_baseline = self
            .balances
            .snapshot(child_session.signer_address(), child_chain.as_ref(), Some(&child_session))
            .await?;
        let parent_baseline = self
            .balances
            .snapshot(parent_session.signer_address(), parent_chain.as_ref(), Some(&parent_session))
            .await?;
        let root_baseline = self
            .balances
            .snapshot(self.root.address(), child_chain.as_ref(), None)
            .await?;
        let recipient_baseline = self
            .balances
            .snapshot(&recipient, parent_chain.as_ref(), None)
            .await?;
        record(report, FlowState::Idle, "child", &child_baseline);
        record(report, FlowState::Idle, "parent", &parent_baseline);
        record(report, FlowState::Idle, "root", &root_baseline);
        record(report, FlowState::Idle, "recipient", &recipient_baseline);
        self.advance(FlowState::SessionsOpen, report);

        // Deposit into the child session
        info!(step = "deposit", chain_id = child_session.chain_id(), "Step started");
        let deposit = self
            .deposits
            .deposit(self.root.signer()?, child_chain.as_ref(), &child_session, &asset_id, amount)
            .await?;
        report.deposit = Some(deposit);

        let expected = child_baseline.free_balance().saturating_add(amount);
        let child_funded = self
            .balances
            .wait_until(
                child_session.signer_address(),
                child_chain.as_ref(),
                Some(&child_session),
                timeout,
                move |s| s.free_balance() >= expected,
            )
            .await?;
        log_snapshot("deposit", &child_funded);
        record(report, FlowState::SessionsOpen, "child", &child_funded);
        self.advance(FlowState::Deposited, report);

        // Transfer child -> parent
        info!(step = "transfer", "Step started");
        let transfer = self
            .router
            .transfer(
                amount,
                &asset_id,
                &child_session,
                parent_session.public_identifier(),
                parent_session.chain_id(),
                None,
            )
            .await?;
        report.transfer = Some(transfer);

        let expected = parent_baseline.free_balance().saturating_add(amount);
        let parent_funded = self
            .balances
            .wait_until(
                parent_session.signer_address(),
                parent_chain.as_ref(),
                Some(&parent_session),
                timeout,
                move |s| s.free_balance() >= expected,
            )
            .await?;
        let ceiling = child_funded.free_balance().saturating_sub(amount);
        let child_after_transfer = self
            .balances
            .wait_until(
                child_session.signer_address(),
                child_chain.as_ref(),
                Some(&child_session),
                timeout,
                move |s| s.free_balance() <= ceiling,
            )
            .await?;
        log_snapshot("transfer", &parent_funded);
        record(report, FlowState::Deposited, "parent", &parent_funded);
        record(report, FlowState::Deposited, "child", &child_after_transfer);
        self.advance(FlowState::Transferred, report);

        // Withdraw from the parent session
        info!(step = "withdraw", chain_id = parent_session.chain_id(), %recipient, "Step started");
        let withdrawal = self
            .finalizer
            .withdraw(&parent_session, amount, &asset_id, &recipient)
            .await?;
        report.withdrawal = Some(withdrawal);

        let ceiling = parent_funded.free_balance().saturating_sub(amount);
        let parent_drained = self
            .balances
            .wait_until(
                parent_session.signer_address(),
                parent_chain.as_ref(),
                Some(&parent_session),
                timeout,
                move |s| s.free_balance() <= ceiling,
            )
            .await?;
        // The node submits the withdrawal; wait for it to land on-chain
        let expected = recipient_baseline.on_chain_balance.saturating_add(amount);
        let recipient_after = self
            .balances
            .wait_until(
                &recipient,
                parent_chain.as_ref(),
                None,
                timeout,
                move |s| s.on_chain_balance >= expected,
            )
            .await?;
        log_snapshot("withdraw", &parent_drained);
        log_snapshot("withdraw", &recipient_after);
        record(report, FlowState::Transferred, "parent", &parent_drained);
        record(report, FlowState::Transferred, "recipient", &recipient_after);
        self.advance(FlowState::Withdrawn, report);

        Ok(())
    }
}

fn record(report: &mut FlowReport, stage: FlowState, subject: &str, snapshot: &BalanceSnapshot) {
    report.snapshots.push(RecordedSnapshot {
        stage,
        subject: subject.to_string(),
        snapshot: snapshot.clone(),
    });
}

fn log_snapshot(step: &str, snapshot: &BalanceSnapshot) {
    info!(
        step,
        address = %snapshot.address,
        chain_id = snapshot.chain_id,
        free_balance = ?snapshot.channel_free_balance,
        on_chain_balance = %snapshot.on_chain_balance,
        on_chain_ether = %format_ether(snapshot.on_chain_balance),
        "Balance confirmed"
    );
}
