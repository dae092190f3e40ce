//! Signing, submission and the local placeholder that follows it.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::activity::store::ActivityStore;
use crate::activity::types::{ActivityKind, Direction, RawActivity};
use crate::blockchain::client::{ChainRpc, RpcError, SubmitReceipt};
use crate::blockchain::types::{unix_now_millis, Account, TransactionIntent};
use crate::signer::{SignError, Signer};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Mock signatures are for emulation only.
    #[error("Refusing to submit a transfer signed by the mock signer")]
    MockSigned,
}

/// What the user sees as the transfer, for the local placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransfer {
    pub to_address: String,
    /// In units of `token_slug`.
    pub amount: u128,
    pub token_slug: String,
    pub fee: u128,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub receipt: SubmitReceipt,
    pub message_hash: String,
    pub local_activity: RawActivity,
}

/// Placeholder shown until the indexer reports the transfer.
pub fn local_activity(transfer: &LocalTransfer) -> RawActivity {
    RawActivity {
        id: format!("{}:local", uuid::Uuid::new_v4()),
        timestamp: unix_now_millis(),
        kind: ActivityKind::Transaction,
        fee: transfer.fee,
        direction: Direction::Outgoing,
        amount: transfer.amount,
        involved_addresses: vec![transfer.to_address.clone()],
        token_slug: transfer.token_slug.clone(),
        should_hide: false,
        comment: transfer.comment.clone(),
        is_local: true,
    }
}

pub struct TransferSubmitter {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<ActivityStore>,
}

impl TransferSubmitter {
    pub fn new(rpc: Arc<dyn ChainRpc>, store: Arc<ActivityStore>) -> Self {
        Self { rpc, store }
    }

    /// Sign `intent` with `signer`, send it, and record a local placeholder.
    ///
    /// Submission is not retried: a lost response does not mean the message
    /// was not accepted.
    pub async fn submit(
        &self,
        signer: &Signer,
        account: &Account,
        intent: TransactionIntent,
        transfer: &LocalTransfer,
    ) -> Result<SubmittedTransfer, SubmitError> {
        if signer.is_mock() {
            return Err(SubmitError::MockSigned);
        }

        let signed = signer.sign_transactions(std::slice::from_ref(&intent)).await?;
        let Some(signed) = signed.into_iter().next() else {
            return Err(SignError::DeviceResponse("no transfer signed".into()).into());
        };

        let receipt = self.rpc.submit_transfer(account.network, &signed).await?;
        let message_hash = signed.message_hash();
        let local = local_activity(transfer);
        self.store.add_local(&account.id, local.clone()).await;

        info!(
            account_id = %account.id,
            backend = signer.backend(),
            tx_id = %receipt.tx_id,
            message_hash = %message_hash,
            "Transfer submitted"
        );

        Ok(SubmittedTransfer {
            receipt,
            message_hash,
            local_activity: local,
        })
    }
}

impl std::fmt::Debug for TransferSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSubmitter").finish_non_exhaustive()
    }
}
