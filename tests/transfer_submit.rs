//! Signing, submission and the placeholder that follows a sent transfer.

use serde_json::json;
use std::sync::Arc;
use zeroize::Zeroizing;

use wallet_core::activity::{ActivityStore, FeedKey};
use wallet_core::blockchain::types::{AccountKind, WalletVersion};
use wallet_core::signer::{SignerFactory, SignerRequest};
use wallet_core::transfer::{LocalTransfer, SubmitError, TransferSubmitter};

mod common;
use common::{FakeResolver, FakeRpc, FakeVault};

fn factory() -> SignerFactory {
    SignerFactory::new(
        Arc::new(FakeVault::abandon()),
        None,
        common::translator(FakeResolver::default()),
    )
}

fn transfer() -> LocalTransfer {
    LocalTransfer {
        to_address: common::address(1).to_friendly(true, false),
        amount: 250_000_000,
        token_slug: "toncoin".into(),
        fee: 2_300_000,
        comment: None,
    }
}

#[tokio::test]
async fn test_mock_signer_is_refused() {
    let rpc = Arc::new(FakeRpc::default());
    let store = Arc::new(ActivityStore::new());
    let submitter = TransferSubmitter::new(rpc.clone(), store.clone());

    let view = common::account(AccountKind::View, WalletVersion::V4R2);
    let signer = factory().signer_for(&view, SignerRequest::default()).unwrap();
    let err = submitter
        .submit(&signer, &view, common::intent(common::address(1), 250_000_000, None, 4), &transfer())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::MockSigned));
    assert!(rpc.submitted.lock().unwrap().is_empty());
    assert!(store.entries(&view.id).await.is_empty());
}

#[tokio::test]
async fn test_submitted_transfer_is_confirmed_by_indexer() {
    let rpc = Arc::new(FakeRpc::default());
    let store = Arc::new(ActivityStore::new());
    let submitter = TransferSubmitter::new(rpc.clone(), store.clone());

    let account = common::account(AccountKind::Mnemonic, WalletVersion::V4R2);
    let signer = factory()
        .signer_for(
            &account,
            SignerRequest {
                password: Some(Zeroizing::new("hunter2".into())),
                ..SignerRequest::default()
            },
        )
        .unwrap();

    let submitted = submitter
        .submit(&signer, &account, common::intent(common::address(1), 250_000_000, None, 4), &transfer())
        .await
        .unwrap();

    let sent = rpc.submitted.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].seqno, 4);
    assert_eq!(submitted.message_hash, sent[0].message_hash());
    assert_eq!(submitted.receipt.tx_id, submitted.message_hash);

    let entries = store.entries(&account.id).await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].activity.is_local);
    assert_eq!(entries[0].activity.id, submitted.local_activity.id);

    let report = store
        .apply_batch(
            &account.id,
            &FeedKey::Native,
            vec![json!({
                "id": "tx:1",
                "timestamp": submitted.local_activity.timestamp + 5_000,
                "fee": 2_100_000,
                "direction": "outgoing",
                "amount": 250_000_000u64,
                "tokenSlug": "toncoin",
            })],
        )
        .await;
    assert_eq!(report.replaced.len(), 1);
    assert_eq!(report.replaced[0].pending_id, submitted.local_activity.id);

    let entries = store.entries(&account.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].activity.id, "tx:1");
    assert!(!entries[0].activity.is_local);
}
