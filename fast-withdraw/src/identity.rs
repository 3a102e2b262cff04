//! Identity Deriver
//!
//! Turns one root identity into deterministic per-session identities. The
//! derived secret is `hash_message(hex(personal_sign(root, message(label))))`,
//! so the root key only ever reaches the derived key through a signature
//! and a hash. Signatures are RFC 6979 deterministic, which makes the whole
//! derivation a pure function of `(root, label)`.

use chain_clients_evm::{hash_message, normalize_address, EvmWallet};
use tracing::debug;

use crate::error::{FlowError, Result};

/// Prefix of the message the root identity signs for each label.
pub const DERIVATION_MESSAGE_PREFIX: &str = "Initiating fast withdraw";

/// The end user's long-lived identity.
///
/// A root identity without key material is watch-only: it can receive
/// withdrawals but any derivation or deposit fails with `FlowError::Signing`.
#[derive(Debug, Clone)]
pub struct RootIdentity {
    address: String,
    wallet: Option<EvmWallet>,
}

impl RootIdentity {
    pub fn from_wallet(wallet: EvmWallet) -> Self {
        Self {
            address: wallet.address().to_string(),
            wallet: Some(wallet),
        }
    }

    /// Loads a root identity from a hex-encoded private key.
    pub fn from_private_key_hex(key: &str) -> Result<Self> {
        let wallet = EvmWallet::from_private_key_hex(key).map_err(|e| FlowError::Signing {
            reason: format!("invalid root key material: {:#}", e),
        })?;
        Ok(Self::from_wallet(wallet))
    }

    /// A root identity known only by address.
    pub fn watch_only(address: &str) -> Result<Self> {
        let address = normalize_address(address)
            .map_err(|e| FlowError::InvalidInput(format!("root address: {:#}", e)))?;
        Ok(Self {
            address,
            wallet: None,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// The signer behind this identity.
    pub fn signer(&self) -> Result<&EvmWallet> {
        self.wallet.as_ref().ok_or_else(|| FlowError::Signing {
            reason: format!("root identity {} has no key loaded", self.address),
        })
    }
}

/// A session identity derived from `(root, label)`.
#[derive(Debug, Clone)]
pub struct DerivedIdentity {
    label: String,
    wallet: EvmWallet,
}

impl DerivedIdentity {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &EvmWallet {
        &self.wallet
    }

    pub fn into_wallet(self) -> EvmWallet {
        self.wallet
    }
}

/// Message the root signs to derive the identity for `label`.
pub fn derivation_message(label: &str) -> String {
    format!("{}: {}", DERIVATION_MESSAGE_PREFIX, label)
}

/// Derives the session identity for `label`.
///
/// # Arguments
///
/// * `root` - Root identity; must hold a key
/// * `label` - Non-empty label, typically the chain role ("child", "parent")
///
/// # Returns
///
/// * `Ok(DerivedIdentity)` - Same output for the same `(root, label)`
/// * `Err(FlowError::Signing)` - Root cannot sign, or the hash is not a valid key
/// * `Err(FlowError::InvalidInput)` - Empty label
pub fn derive(root: &RootIdentity, label: &str) -> Result<DerivedIdentity> {
    if label.trim().is_empty() {
        return Err(FlowError::InvalidInput(
            "derivation label must not be empty".to_string(),
        ));
    }

    let signer = root.signer()?;
    let signature = signer
        .sign_message(derivation_message(label).as_bytes())
        .map_err(|e| FlowError::Signing {
            reason: format!("root could not sign derivation message: {:#}", e),
        })?;

    let seed = hash_message(format!("0x{}", hex::encode(signature)).as_bytes());
    let wallet = EvmWallet::from_bytes(&seed).map_err(|e| FlowError::Signing {
        reason: format!("derived seed for label '{}' is not a valid key: {:#}", label, e),
    })?;

    debug!(label, address = wallet.address(), "Derived session identity");

    Ok(DerivedIdentity {
        label: label.to_string(),
        wallet,
    })
}
