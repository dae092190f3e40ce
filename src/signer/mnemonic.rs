//! Signing with a password-protected mnemonic.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;
use zeroize::Zeroizing;

use crate::blockchain::address::Address;
use crate::blockchain::transfer::SignedTransfer;
use crate::blockchain::types::{Network, TonWallet, TransactionIntent};
use crate::signer::comment;
use crate::signer::keys::{derive_key_pair, KeyPair};
use crate::signer::proof::{proof_hash, sign_data_hash, SignDataPayload, TonProof};
use crate::signer::software::sign_transfers;
use crate::signer::types::{SignError, SignResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct VaultError(pub String);

/// Encrypted mnemonic storage. Password checks happen behind this trait.
#[async_trait]
pub trait MnemonicVault: Send + Sync {
    /// `None` when the password does not open the vault.
    async fn fetch_mnemonic(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<Option<Zeroizing<Vec<String>>>, VaultError>;
}

/// Software signer for one user-facing operation.
///
/// The key pair is derived on first use and dropped, zeroized, with the signer.
pub struct MnemonicSigner {
    account_id: String,
    network: Network,
    wallet: TonWallet,
    password: Zeroizing<String>,
    vault: Arc<dyn MnemonicVault>,
    key_pair: OnceCell<KeyPair>,
}

impl MnemonicSigner {
    pub fn new(
        account_id: String,
        network: Network,
        wallet: TonWallet,
        password: Zeroizing<String>,
        vault: Arc<dyn MnemonicVault>,
    ) -> Self {
        Self {
            account_id,
            network,
            wallet,
            password,
            vault,
            key_pair: OnceCell::new(),
        }
    }

    async fn key_pair(&self) -> SignResult<&KeyPair> {
        self.key_pair
            .get_or_try_init(|| async {
                let words = self
                    .vault
                    .fetch_mnemonic(&self.account_id, &self.password)
                    .await
                    .map_err(|e| SignError::Vault(e.0))?
                    .ok_or(SignError::InvalidPassword)?;
                debug!(account_id = %self.account_id, "Deriving key pair");
                derive_key_pair(words).await
            })
            .await
    }

    pub async fn sign_transactions(&self, intents: &[TransactionIntent]) -> SignResult<Vec<SignedTransfer>> {
        let key_pair = self.key_pair().await?;
        sign_transfers(intents, &self.wallet, self.network, |hash| key_pair.sign(hash))
    }

    pub async fn sign_proof(&self, proof: &TonProof) -> SignResult<[u8; 64]> {
        let key_pair = self.key_pair().await?;
        Ok(key_pair.sign(&proof_hash(&self.wallet.address, proof)))
    }

    pub async fn sign_data(&self, timestamp: u64, domain: &str, payload: &SignDataPayload) -> SignResult<[u8; 64]> {
        let key_pair = self.key_pair().await?;
        Ok(key_pair.sign(&sign_data_hash(&self.wallet.address, timestamp, domain, payload)))
    }

    pub async fn encrypt_comment(&self, text: &str, recipient_public: &[u8; 32]) -> SignResult<Vec<u8>> {
        let key_pair = self.key_pair().await?;
        comment::encrypt_comment(
            text,
            key_pair.signing_key(),
            &key_pair.public_key(),
            recipient_public,
            &self.wallet.address,
        )
    }

    pub async fn decrypt_comment(&self, encrypted: &[u8], sender: &Address) -> SignResult<String> {
        let key_pair = self.key_pair().await?;
        comment::decrypt_comment(encrypted, key_pair.signing_key(), &key_pair.public_key(), sender)
    }
}

impl std::fmt::Debug for MnemonicSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicSigner")
            .field("account_id", &self.account_id)
            .field("network", &self.network)
            .field("unlocked", &self.key_pair.initialized())
            .finish_non_exhaustive()
    }
}
