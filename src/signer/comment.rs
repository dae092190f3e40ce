//! End-to-end encrypted transfer comments.
//!
//! Layout: `pub_xor(32) || nonce(12) || ciphertext`. `pub_xor` is the XOR of
//! both parties' ed25519 public keys, so whichever side holds one key can
//! recover the other and derive the same shared secret. The symmetric key is
//! HMAC-SHA512 of the X25519 shared secret salted with the sender address.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::blockchain::address::Address;
use crate::signer::types::{SignError, SignResult};

const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 32 + NONCE_LEN;

fn shared_key(secret: &SigningKey, other_public: &[u8; 32], sender: &Address) -> SignResult<Zeroizing<[u8; 32]>> {
    let other = VerifyingKey::from_bytes(other_public).map_err(|e| SignError::KeyDerivation(e.to_string()))?;
    let static_secret = StaticSecret::from(secret.to_scalar_bytes());
    let shared = static_secret.diffie_hellman(&PublicKey::from(other.to_montgomery().to_bytes()));

    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(shared.as_bytes())
        .map_err(|e| SignError::KeyDerivation(e.to_string()))?;
    mac.update(sender.to_raw().as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&mac.finalize().into_bytes()[..32]);
    Ok(key)
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    out
}

pub fn encrypt_comment(
    comment: &str,
    secret: &SigningKey,
    own_public: &[u8; 32],
    recipient_public: &[u8; 32],
    sender: &Address,
) -> SignResult<Vec<u8>> {
    let key = shared_key(secret, recipient_public, sender)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), comment.as_bytes())
        .map_err(|e| SignError::KeyDerivation(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(&xor(own_public, recipient_public));
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt_comment(
    encrypted: &[u8],
    secret: &SigningKey,
    own_public: &[u8; 32],
    sender: &Address,
) -> SignResult<String> {
    if encrypted.len() < HEADER_LEN {
        return Err(SignError::DecryptFailed);
    }
    let mut pub_xor = [0u8; 32];
    pub_xor.copy_from_slice(&encrypted[..32]);
    let other_public = xor(&pub_xor, own_public);

    let key = shared_key(secret, &other_public, sender).map_err(|_| SignError::DecryptFailed)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&encrypted[32..HEADER_LEN]), &encrypted[HEADER_LEN..])
        .map_err(|_| SignError::DecryptFailed)?;
    String::from_utf8(plaintext).map_err(|_| SignError::DecryptFailed)
}
