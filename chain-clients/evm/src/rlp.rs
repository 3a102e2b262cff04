//! RLP encoding helpers (for legacy EVM transactions)
//!
//! Only the subset needed to serialize flat transaction lists: byte strings
//! and a single list level.

/// Encodes an unsigned integer as big-endian bytes with no leading zeros.
///
/// Zero encodes as the empty byte string, as RLP requires.
pub fn encode_uint(val: u128) -> Vec<u8> {
    trim_leading_zeros(&val.to_be_bytes()).to_vec()
}

/// Strips leading zero bytes (used for signature scalars).
pub fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// RLP-encodes a single byte-string item.
pub fn encode_item(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        vec![data[0]]
    } else if data.len() <= 55 {
        let mut out = vec![0x80 + data.len() as u8];
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = encode_uint(data.len() as u128);
        let mut out = vec![0xb7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// RLP-encodes a list of items (each item is raw bytes, NOT already RLP-encoded).
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flat_map(|item| encode_item(item)).collect();

    if payload.len() <= 55 {
        let mut out = vec![0xc0 + payload.len() as u8];
        out.extend(payload);
        out
    } else {
        let len_bytes = encode_uint(payload.len() as u128);
        let mut out = vec![0xf7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend(payload);
        out
    }
}
