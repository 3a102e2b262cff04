//! EVM address helpers

use anyhow::Result;

/// Asset identifier used for the chain's native currency.
pub const NATIVE_ASSET_ID: &str = "0x0000000000000000000000000000000000000000";

/// Validates an EVM address and returns it lowercased with a `0x` prefix.
///
/// # Arguments
///
/// * `addr` - `0x`-prefixed 20-byte hex address (any case)
///
/// # Returns
///
/// * `Ok(String)` - Normalized address
/// * `Err(anyhow::Error)` - Address is not 20 bytes of hex
pub fn normalize_address(addr: &str) -> Result<String> {
    let stripped = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .ok_or_else(|| anyhow::anyhow!("EVM address must be 0x-prefixed: '{}'", addr))?;
    let bytes = hex::decode(stripped)
        .map_err(|_| anyhow::anyhow!("Invalid hex in EVM address: '{}'", addr))?;
    if bytes.len() != 20 {
        anyhow::bail!(
            "Invalid EVM address length: expected 20 bytes, got {}",
            bytes.len()
        );
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Decodes a validated EVM address into its 20 raw bytes.
pub fn address_bytes(addr: &str) -> Result<[u8; 20]> {
    let normalized = normalize_address(addr)?;
    let bytes = hex::decode(&normalized[2..])?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Returns true when `asset_id` names the native currency.
pub fn is_native_asset(asset_id: &str) -> bool {
    normalize_address(asset_id)
        .map(|a| a == NATIVE_ASSET_ID)
        .unwrap_or(false)
}
