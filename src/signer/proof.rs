//! TonConnect proof and sign-data messages.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::blockchain::address::Address;
use crate::signer::types::{SignError, SignResult};

const PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const PROOF_ENVELOPE: &[u8] = b"ton-connect";
const SIGN_DATA_ENVELOPE: &[u8] = b"ton-connect/sign-data/";

pub const MAX_DEVICE_PROOF_PAYLOAD: usize = 128;
pub const MAX_DEVICE_PROOF_DOMAIN: usize = 128;
pub const MAX_DEVICE_PROOF_TOTAL: usize = 222;

/// Proof of wallet ownership requested by a dapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonProof {
    pub domain: String,
    /// Unix seconds.
    pub timestamp: u64,
    pub payload: String,
}

impl TonProof {
    /// Hardware devices refuse proofs above these sizes.
    pub fn check_device_limits(&self) -> SignResult<()> {
        let domain = self.domain.len();
        let payload = self.payload.len();
        if domain > MAX_DEVICE_PROOF_DOMAIN
            || payload > MAX_DEVICE_PROOF_PAYLOAD
            || domain + payload > MAX_DEVICE_PROOF_TOTAL
        {
            return Err(SignError::ProofTooLarge);
        }
        Ok(())
    }
}

/// Data a dapp asks the user to sign outside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignDataPayload {
    Text { text: String },
    Binary { bytes: Vec<u8> },
}

fn put_address(out: &mut Vec<u8>, address: &Address) {
    out.extend_from_slice(&(address.workchain() as i32).to_be_bytes());
    out.extend_from_slice(address.hash());
}

/// Hash signed for a TonConnect proof.
pub fn proof_hash(wallet: &Address, proof: &TonProof) -> [u8; 32] {
    let mut message = PROOF_PREFIX.to_vec();
    put_address(&mut message, wallet);
    message.extend_from_slice(&(proof.domain.len() as u32).to_le_bytes());
    message.extend_from_slice(proof.domain.as_bytes());
    message.extend_from_slice(&proof.timestamp.to_le_bytes());
    message.extend_from_slice(proof.payload.as_bytes());

    let mut envelope = vec![0xff, 0xff];
    envelope.extend_from_slice(PROOF_ENVELOPE);
    envelope.extend_from_slice(&Sha256::digest(&message));
    Sha256::digest(&envelope).into()
}

/// Hash signed for a sign-data request.
pub fn sign_data_hash(wallet: &Address, timestamp: u64, domain: &str, payload: &SignDataPayload) -> [u8; 32] {
    let mut message = vec![0xff, 0xff];
    message.extend_from_slice(SIGN_DATA_ENVELOPE);
    put_address(&mut message, wallet);
    message.extend_from_slice(&(domain.len() as u32).to_be_bytes());
    message.extend_from_slice(domain.as_bytes());
    message.extend_from_slice(&timestamp.to_be_bytes());

    let (prefix, data): (&[u8], &[u8]) = match payload {
        SignDataPayload::Text { text } => (b"txt", text.as_bytes()),
        SignDataPayload::Binary { bytes } => (b"bin", bytes),
    };
    message.extend_from_slice(prefix);
    message.extend_from_slice(&(data.len() as u32).to_be_bytes());
    message.extend_from_slice(data);
    Sha256::digest(&message).into()
}
