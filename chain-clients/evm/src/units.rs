//! Quantity encoding and unit formatting

use anyhow::{Context, Result};

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Parses a JSON-RPC hex quantity ("0x1bc16d674ec80000") into base units.
pub fn parse_quantity(quantity: &str) -> Result<u128> {
    let digits = quantity.strip_prefix("0x").unwrap_or(quantity);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .with_context(|| format!("Failed to parse hex quantity '{}'", quantity))
}

/// Encodes base units as a JSON-RPC hex quantity (no leading zeros).
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Formats wei as a decimal ether string, always keeping one fractional digit.
///
/// `1_500_000_000_000_000_000` becomes `"1.5"`, `10^18` becomes `"1.0"`.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{}.0", whole);
    }
    let frac_str = format!("{:018}", frac);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
