//! Unit tests for the transfer router

use chain_clients_evm::NATIVE_ASSET_ID;
use fast_withdraw::channel::SessionStore;
use fast_withdraw::error::FlowError;
use fast_withdraw::service::TransferRouter;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{open_test_sessions, MockNetwork, DUMMY_TOKEN_ADDR_EVM, ONE_ETHER, PARENT_CHAIN_ID};

/// 1. Test: Transfer Success
/// Verifies that transfer() moves the amount between sessions and tags it with the
/// receiving chain and asset.
/// Why: conservation for transfers (sender loss = recipient gain).
#[tokio::test]
async fn test_transfer_success() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, parent) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    network.credit_channel(child.public_identifier(), NATIVE_ASSET_ID, 3 * ONE_ETHER);

    let receipt = TransferRouter::new()
        .transfer(
            ONE_ETHER,
            NATIVE_ASSET_ID,
            &child,
            parent.public_identifier(),
            PARENT_CHAIN_ID,
            None,
        )
        .await
        .unwrap();

    assert!(!receipt.transfer_id.is_empty());
    assert_eq!(receipt.transfer.sender, child.public_identifier());
    assert_eq!(receipt.transfer.recipient, parent.public_identifier());
    assert_eq!(receipt.transfer.meta.receiver_chain_id, PARENT_CHAIN_ID);
    assert_eq!(receipt.transfer.meta.receiver_asset_id, NATIVE_ASSET_ID);

    assert_eq!(network.free_balance(child.public_identifier(), NATIVE_ASSET_ID), 2 * ONE_ETHER);
    assert_eq!(network.free_balance(parent.public_identifier(), NATIVE_ASSET_ID), ONE_ETHER);

    let submitted = network.transfers();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].amount, ONE_ETHER);
    assert_eq!(submitted[0].meta.receiver_chain_id, PARENT_CHAIN_ID);
}

/// 2. Test: Explicit Receiver Asset
/// Verifies that a receiver asset id overrides the default.
#[tokio::test]
async fn test_transfer_with_receiver_asset() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, parent) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    network.credit_channel(child.public_identifier(), NATIVE_ASSET_ID, ONE_ETHER);

    let receipt = TransferRouter::new()
        .transfer(
            ONE_ETHER,
            NATIVE_ASSET_ID,
            &child,
            parent.public_identifier(),
            PARENT_CHAIN_ID,
            Some(DUMMY_TOKEN_ADDR_EVM),
        )
        .await
        .unwrap();

    assert_eq!(receipt.transfer.meta.receiver_asset_id, DUMMY_TOKEN_ADDR_EVM);
    assert_eq!(network.free_balance(parent.public_identifier(), DUMMY_TOKEN_ADDR_EVM), ONE_ETHER);
}

/// 3. Test: Insufficient Free Balance
/// Verifies that transfer() fails before submission when the sender cannot cover the amount.
#[tokio::test]
async fn test_transfer_insufficient_free_balance() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, parent) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    network.credit_channel(child.public_identifier(), NATIVE_ASSET_ID, ONE_ETHER / 2);

    let result = TransferRouter::new()
        .transfer(
            ONE_ETHER,
            NATIVE_ASSET_ID,
            &child,
            parent.public_identifier(),
            PARENT_CHAIN_ID,
            None,
        )
        .await;

    match result {
        Err(FlowError::InsufficientFreeBalance { required, .. }) => assert_eq!(required, ONE_ETHER),
        other => panic!("expected InsufficientFreeBalance, got {:?}", other),
    }
    assert!(network.transfers().is_empty());
    assert_eq!(network.free_balance(child.public_identifier(), NATIVE_ASSET_ID), ONE_ETHER / 2);
}

/// 4. Test: Node Rejection
/// Verifies that a node refusal surfaces as TransferRejected and moves nothing.
#[tokio::test]
async fn test_transfer_rejected_by_node() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, parent) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    network.credit_channel(child.public_identifier(), NATIVE_ASSET_ID, ONE_ETHER);
    network.with_ledger(|l| l.reject_transfers = Some("routing unavailable".to_string()));

    let result = TransferRouter::new()
        .transfer(
            ONE_ETHER,
            NATIVE_ASSET_ID,
            &child,
            parent.public_identifier(),
            PARENT_CHAIN_ID,
            None,
        )
        .await;

    match result {
        Err(FlowError::TransferRejected { reason, .. }) => assert!(reason.contains("routing unavailable")),
        other => panic!("expected TransferRejected, got {:?}", other),
    }
    assert_eq!(network.free_balance(child.public_identifier(), NATIVE_ASSET_ID), ONE_ETHER);
    assert_eq!(network.free_balance(parent.public_identifier(), NATIVE_ASSET_ID), 0);
}

/// 5. Test: Unknown Recipient
/// Verifies that a transfer to a routing identifier the node does not know is rejected.
#[tokio::test]
async fn test_transfer_unknown_recipient() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, _) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    network.credit_channel(child.public_identifier(), NATIVE_ASSET_ID, ONE_ETHER);

    let result = TransferRouter::new()
        .transfer(ONE_ETHER, NATIVE_ASSET_ID, &child, "vector-unknown", PARENT_CHAIN_ID, None)
        .await;
    assert!(matches!(result, Err(FlowError::TransferRejected { .. })));
}

/// 6. Test: Input Validation
/// Verifies that zero amounts and self-transfers are rejected.
#[tokio::test]
async fn test_transfer_rejects_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let network = MockNetwork::new();
    let (child, parent) = open_test_sessions(&network, SessionStore::new(dir.path())).await;
    let router = TransferRouter::new();

    let zero = router
        .transfer(0, NATIVE_ASSET_ID, &child, parent.public_identifier(), PARENT_CHAIN_ID, None)
        .await;
    assert!(matches!(zero, Err(FlowError::InvalidInput(_))));

    let to_self = router
        .transfer(ONE_ETHER, NATIVE_ASSET_ID, &child, child.public_identifier(), PARENT_CHAIN_ID, None)
        .await;
    assert!(matches!(to_self, Err(FlowError::InvalidInput(_))));
}
