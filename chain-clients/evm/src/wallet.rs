//! Local secp256k1 signer
//!
//! Private keys must never be exposed or logged. `EvmWallet` prints only its
//! address in `Debug` output.

use std::fmt;

use anyhow::{Context, Result};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// EIP-191 personal message hash:
/// keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
pub fn hash_message(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Ethereum address of a public key: keccak256(uncompressed_point[1..])[12..32]
fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the signer address from an EIP-191 signature (r || s || v).
///
/// # Arguments
///
/// * `message` - The message that was signed (before EIP-191 hashing)
/// * `signature` - 65-byte signature, `v` either 0/1 or 27/28
pub fn recover_message_signer(message: &[u8], signature: &[u8]) -> Result<String> {
    if signature.len() != 65 {
        anyhow::bail!(
            "Invalid signature length: expected 65 bytes, got {}",
            signature.len()
        );
    }
    let v = signature[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| anyhow::anyhow!("Invalid recovery id {}", v))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| anyhow::anyhow!("Invalid signature encoding: {}", e))?;
    let hash = hash_message(message);
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| anyhow::anyhow!("Failed to recover signer: {}", e))?;
    Ok(address_of(&key))
}

/// A secp256k1 key pair with its derived Ethereum address.
#[derive(Clone)]
pub struct EvmWallet {
    signing_key: SigningKey,
    address: String,
}

impl EvmWallet {
    /// Creates a wallet from a raw 32-byte secret.
    ///
    /// Fails if the bytes are not a valid secp256k1 scalar (zero or >= curve order).
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid secp256k1 private key: {}", e))?;
        let address = address_of(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Creates a wallet from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key_hex(key: &str) -> Result<Self> {
        let key_hex = key.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_bytes = hex::decode(key_hex).context("Failed to decode private key from hex")?;
        if key_bytes.len() != 32 {
            anyhow::bail!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            );
        }
        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(&key_bytes);
        Self::from_bytes(&key_array)
    }

    /// Lowercase `0x`-prefixed address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signs a 32-byte prehash, returning `(r, s, recovery_id)`.
    ///
    /// Signatures are deterministic (RFC 6979) and low-S normalized.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8)> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign hash: {}", e))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok((r, s, recovery_id.to_byte()))
    }

    /// EIP-191 `personal_sign`: returns r || s || v with v in {27, 28}.
    pub fn sign_message(&self, message: &[u8]) -> Result<[u8; 65]> {
        let hash = hash_message(message);
        let (r, s, recovery_id) = self.sign_hash(&hash)?;
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&r);
        out[32..64].copy_from_slice(&s);
        out[64] = recovery_id + 27;
        Ok(out)
    }
}

impl fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
