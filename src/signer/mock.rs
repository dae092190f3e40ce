//! Signer for fee emulation and view-only accounts.
//!
//! Produces well-formed output with zero signatures. Never touches secrets.

use ed25519_dalek::SigningKey;

use crate::blockchain::address::Address;
use crate::blockchain::transfer::SignedTransfer;
use crate::blockchain::types::{Network, TonWallet, TransactionIntent};
use crate::signer::comment;
use crate::signer::software::sign_transfers;
use crate::signer::types::SignResult;

#[derive(Debug, Clone)]
pub struct MockSigner {
    network: Network,
    wallet: TonWallet,
}

impl MockSigner {
    pub fn new(network: Network, wallet: TonWallet) -> Self {
        Self { network, wallet }
    }

    fn public_key(&self) -> [u8; 32] {
        self.wallet.public_key_bytes().unwrap_or([0; 32])
    }

    pub fn sign_transactions(&self, intents: &[TransactionIntent]) -> SignResult<Vec<SignedTransfer>> {
        sign_transfers(intents, &self.wallet, self.network, |_| [0; 64])
    }

    pub fn sign_proof(&self) -> SignResult<[u8; 64]> {
        Ok([0; 64])
    }

    pub fn sign_data(&self) -> SignResult<[u8; 64]> {
        Ok([0; 64])
    }

    /// Encrypts with an all-zero secret; sizes match a real encryption.
    pub fn encrypt_comment(&self, text: &str, recipient_public: &[u8; 32]) -> SignResult<Vec<u8>> {
        let zero = SigningKey::from_bytes(&[0; 32]);
        comment::encrypt_comment(text, &zero, &self.public_key(), recipient_public, &self.wallet.address)
    }

    pub fn decrypt_comment(&self, encrypted: &[u8], sender: &Address) -> SignResult<String> {
        let zero = SigningKey::from_bytes(&[0; 32]);
        comment::decrypt_comment(encrypted, &zero, &self.public_key(), sender)
    }
}
