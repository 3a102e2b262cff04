//! EVM chain client library
//!
//! JSON-RPC access to EVM-compatible chains plus the local secp256k1 signer
//! used to authorize transactions and channel sessions.

pub mod address;
pub mod client;
pub mod rlp;
pub mod transaction;
pub mod units;
pub mod wallet;

// Re-export public types for convenience
pub use address::{normalize_address, NATIVE_ASSET_ID};
pub use client::{EvmClient, TransactionReceipt, TransactionRequest};
pub use transaction::LegacyTransaction;
pub use units::{format_ether, parse_quantity, to_quantity};
pub use wallet::{hash_message, keccak256, recover_message_signer, EvmWallet};
