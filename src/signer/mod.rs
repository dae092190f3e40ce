//! Signing over three key-material backends.
//!
//! # Data Flow
//! ```text
//! Account + SignerRequest
//!     → SignerFactory::signer_for (picks the backend)
//!     → Signer::{Mnemonic, Ledger, Mock}
//!         Mnemonic: vault → keys.rs (blocking derivation) → software.rs
//!         Ledger:   ledger::translator → ledger::device
//!         Mock:     software.rs with zero signatures
//!     → SignedTransfer per intent, in input order
//! ```
//!
//! # Design Decisions
//! - A signer lives for one user-facing operation; derived keys die with it
//! - No partial results: a batch either fully signs or returns one error

pub mod comment;
pub mod keys;
pub mod ledger;
pub mod mnemonic;
pub mod mock;
pub mod proof;
pub mod software;
pub mod types;

use std::sync::Arc;
use std::time::Instant;
use zeroize::Zeroizing;

use crate::blockchain::address::Address;
use crate::blockchain::transfer::SignedTransfer;
use crate::blockchain::types::{Account, AccountKind, TransactionIntent};
use crate::ledger::device::{CancelHandle, LedgerDevice};
use crate::ledger::translator::PayloadTranslator;
use crate::observability::metrics;

pub use ledger::LedgerSigner;
pub use mnemonic::{MnemonicSigner, MnemonicVault, VaultError};
pub use mock::MockSigner;
pub use proof::{SignDataPayload, TonProof};
pub use types::{SignError, SignResult};

#[derive(Debug)]
pub enum Signer {
    Mnemonic(MnemonicSigner),
    Ledger(LedgerSigner),
    Mock(MockSigner),
}

impl Signer {
    /// Whether signatures are fake, e.g. for fee emulation.
    pub fn is_mock(&self) -> bool {
        matches!(self, Signer::Mock(_))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Signer::Mnemonic(_) => "mnemonic",
            Signer::Ledger(_) => "ledger",
            Signer::Mock(_) => "mock",
        }
    }

    fn record<T>(&self, started: Instant, result: &SignResult<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(SignError::RejectedByUser) => "rejected",
            Err(SignError::Cancelled) => "cancelled",
            Err(_) => "error",
        };
        metrics::record_sign_request(self.backend(), outcome, started);
    }

    /// Sign each intent; output order matches input order.
    ///
    /// # Panics
    /// If an intent has no messages.
    pub async fn sign_transactions(&self, intents: &[TransactionIntent]) -> SignResult<Vec<SignedTransfer>> {
        let started = Instant::now();
        let result = match self {
            Signer::Mnemonic(signer) => signer.sign_transactions(intents).await,
            Signer::Ledger(signer) => signer.sign_transactions(intents).await,
            Signer::Mock(signer) => signer.sign_transactions(intents),
        };
        self.record(started, &result);
        result
    }

    pub async fn sign_proof(&self, proof: &TonProof) -> SignResult<[u8; 64]> {
        let started = Instant::now();
        let result = match self {
            Signer::Mnemonic(signer) => signer.sign_proof(proof).await,
            Signer::Ledger(signer) => signer.sign_proof(proof).await,
            Signer::Mock(signer) => signer.sign_proof(),
        };
        self.record(started, &result);
        result
    }

    pub async fn sign_data(&self, timestamp: u64, domain: &str, payload: &SignDataPayload) -> SignResult<[u8; 64]> {
        match self {
            Signer::Mnemonic(signer) => signer.sign_data(timestamp, domain, payload).await,
            Signer::Ledger(_) => Err(SignError::UnsupportedByBackend("sign data")),
            Signer::Mock(signer) => signer.sign_data(),
        }
    }

    pub async fn encrypt_comment(&self, text: &str, recipient_public: &[u8; 32]) -> SignResult<Vec<u8>> {
        match self {
            Signer::Mnemonic(signer) => signer.encrypt_comment(text, recipient_public).await,
            Signer::Ledger(_) => Err(SignError::UnsupportedByBackend("comment encryption")),
            Signer::Mock(signer) => signer.encrypt_comment(text, recipient_public),
        }
    }

    pub async fn decrypt_comment(&self, encrypted: &[u8], sender: &Address) -> SignResult<String> {
        match self {
            Signer::Mnemonic(signer) => signer.decrypt_comment(encrypted, sender).await,
            Signer::Ledger(_) => Err(SignError::UnsupportedByBackend("comment decryption")),
            Signer::Mock(signer) => signer.decrypt_comment(encrypted, sender),
        }
    }
}

/// Per-operation options for [`SignerFactory::signer_for`].
#[derive(Default)]
pub struct SignerRequest {
    /// Required for mnemonic accounts unless `mock` is set.
    pub password: Option<Zeroizing<String>>,
    /// Only emulate; never touch key material.
    pub mock: bool,
    /// Overrides the account's subwallet id on hardware, e.g. for vesting contracts.
    pub subwallet_id: Option<u32>,
    pub cancel: CancelHandle,
}

impl std::fmt::Debug for SignerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerRequest")
            .field("has_password", &self.password.is_some())
            .field("mock", &self.mock)
            .field("subwallet_id", &self.subwallet_id)
            .finish()
    }
}

/// Builds the signer matching an account's key material.
pub struct SignerFactory {
    vault: Arc<dyn MnemonicVault>,
    device: Option<Arc<LedgerDevice>>,
    translator: Arc<PayloadTranslator>,
}

impl SignerFactory {
    pub fn new(
        vault: Arc<dyn MnemonicVault>,
        device: Option<Arc<LedgerDevice>>,
        translator: Arc<PayloadTranslator>,
    ) -> Self {
        Self {
            vault,
            device,
            translator,
        }
    }

    pub fn signer_for(&self, account: &Account, request: SignerRequest) -> SignResult<Signer> {
        if request.mock {
            return Ok(Signer::Mock(MockSigner::new(account.network, account.ton.clone())));
        }

        match &account.kind {
            AccountKind::View => Ok(Signer::Mock(MockSigner::new(account.network, account.ton.clone()))),
            AccountKind::Ledger { index, subwallet_id } => {
                let device = self
                    .device
                    .clone()
                    .ok_or_else(|| SignError::Connection("no device connected".into()))?;
                Ok(Signer::Ledger(LedgerSigner::new(
                    account.network,
                    account.ton.clone(),
                    *index,
                    request.subwallet_id.or(*subwallet_id),
                    device,
                    self.translator.clone(),
                    request.cancel,
                )))
            }
            AccountKind::Mnemonic => {
                let password = request.password.ok_or(SignError::PasswordRequired)?;
                Ok(Signer::Mnemonic(MnemonicSigner::new(
                    account.id.clone(),
                    account.network,
                    account.ton.clone(),
                    password,
                    self.vault.clone(),
                )))
            }
        }
    }
}

impl std::fmt::Debug for SignerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerFactory")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}
