//! Shared test helpers for EVM chain client tests

#![allow(dead_code)]

use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Well-known development private key (account #0 of the default dev mnemonic)
pub const DEV_PRIVATE_KEY_0: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address of DEV_PRIVATE_KEY_0
pub const DEV_ADDRESS_0: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Well-known development private key (account #1)
pub const DEV_PRIVATE_KEY_1: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Address of DEV_PRIVATE_KEY_1
pub const DEV_ADDRESS_1: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

/// Dummy token address (EVM format, 40 hex characters)
pub const DUMMY_TOKEN_ADDR_EVM: &str = "0x000000000000000000000000000000000000000a";

/// Dummy transaction hash (64 hex characters)
pub const DUMMY_TX_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000012";

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Mounts a JSON-RPC handler that answers `rpc_method` with `result`.
pub async fn mount_rpc_result(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        })))
        .mount(server)
        .await;
}

/// Mounts a JSON-RPC handler that answers `rpc_method` with an error object.
pub async fn mount_rpc_error(server: &MockServer, rpc_method: &str, code: i64, message: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": code, "message": message },
            "id": 1
        })))
        .mount(server)
        .await;
}
