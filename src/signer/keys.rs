//! TON mnemonic key derivation.

use ed25519_dalek::{Signer as _, SigningKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::signer::types::{SignError, SignResult};

const SEED_SALT: &[u8] = b"TON default seed";
const SEED_ITERATIONS: u32 = 100_000;

/// An ed25519 key pair. The secret half is wiped when dropped.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Derive the 32-byte ed25519 seed from mnemonic words.
///
/// HMAC-SHA512 of the space-joined words gives the entropy, which is
/// stretched with PBKDF2-SHA512.
pub fn mnemonic_to_seed(words: &[String]) -> SignResult<Zeroizing<[u8; 32]>> {
    if words.is_empty() {
        return Err(SignError::KeyDerivation("empty mnemonic".into()));
    }
    let phrase = Zeroizing::new(words.join(" "));

    let mut mac = Hmac::<Sha512>::new_from_slice(phrase.as_bytes())
        .map_err(|e| SignError::KeyDerivation(e.to_string()))?;
    mac.update(b"");
    let mut entropy = Zeroizing::new([0u8; 64]);
    entropy.copy_from_slice(&mac.finalize().into_bytes());

    let mut stretched = Zeroizing::new([0u8; 64]);
    pbkdf2::pbkdf2_hmac::<Sha512>(&entropy[..], SEED_SALT, SEED_ITERATIONS, &mut stretched[..]);

    let mut seed = Zeroizing::new([0u8; 32]);
    seed.copy_from_slice(&stretched[..32]);
    Ok(seed)
}

/// Derive a key pair off the async runtime; PBKDF2 takes a noticeable time.
pub async fn derive_key_pair(words: Zeroizing<Vec<String>>) -> SignResult<KeyPair> {
    tokio::task::spawn_blocking(move || {
        let seed = mnemonic_to_seed(&words)?;
        Ok(KeyPair::from_seed(&seed))
    })
    .await
    .map_err(|e| SignError::KeyDerivation(e.to_string()))?
}
