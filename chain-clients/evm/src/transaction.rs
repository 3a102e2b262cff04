//! Legacy (pre-EIP-1559) transaction encoding with EIP-155 replay protection

use anyhow::{Context, Result};

use crate::address::address_bytes;
use crate::rlp::{encode_list, encode_uint, trim_leading_zeros};
use crate::wallet::{keccak256, EvmWallet};

/// Unsigned legacy transaction fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Recipient address (0x-prefixed, 20 bytes)
    pub to: String,
    /// Value in wei
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    /// Keccak256 of the EIP-155 signing payload:
    /// rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])
    pub fn signing_hash(&self) -> Result<[u8; 32]> {
        let to_bytes = address_bytes(&self.to).context("Invalid transaction recipient")?;
        let unsigned_items: Vec<Vec<u8>> = vec![
            encode_uint(self.nonce as u128),
            encode_uint(self.gas_price),
            encode_uint(self.gas_limit as u128),
            to_bytes.to_vec(),
            encode_uint(self.value),
            self.data.clone(),
            encode_uint(self.chain_id as u128),
            vec![],
            vec![],
        ];
        Ok(keccak256(&encode_list(&unsigned_items)))
    }

    /// Signs the transaction and returns the raw RLP bytes ready for
    /// `eth_sendRawTransaction`.
    pub fn sign(&self, wallet: &EvmWallet) -> Result<Vec<u8>> {
        let hash = self.signing_hash()?;
        let (r, s, recovery_id) = wallet
            .sign_hash(&hash)
            .context("Failed to sign EVM transaction")?;

        // EIP-155: v = recovery_id + chainId * 2 + 35
        let v = recovery_id as u128 + self.chain_id as u128 * 2 + 35;

        let to_bytes = address_bytes(&self.to)?;
        let signed_items: Vec<Vec<u8>> = vec![
            encode_uint(self.nonce as u128),
            encode_uint(self.gas_price),
            encode_uint(self.gas_limit as u128),
            to_bytes.to_vec(),
            encode_uint(self.value),
            self.data.clone(),
            encode_uint(v),
            trim_leading_zeros(&r).to_vec(),
            trim_leading_zeros(&s).to_vec(),
        ];
        Ok(encode_list(&signed_items))
    }
}
