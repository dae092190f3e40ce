//! Wallet transfer construction.
//!
//! # Responsibilities
//! - Serialize a [`TransactionIntent`] into the bytes the wallet contract verifies
//! - Derive the wallet id for each contract version
//! - Assemble the signed external message from a signature and the payload
//!
//! # Layout
//! ```text
//! wallet_id:u32 | valid_until:u32 | seqno:u32 | [v4: op:u8] | [W5: auth:u32]
//!     | per message: send_mode:u8 | destination:33 | bounce:u8 | value:u128
//!                    | state_init:opt | body:opt
//! ```
//! W5 places the signature after the payload; older versions put it first.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::blockchain::body::BodyWriter;
use crate::blockchain::types::{AuthType, Message, Network, TransactionIntent, WalletVersion};

/// Wallet id used by v3 and v4 contracts in the base workchain.
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Prefix of a W5 external message signed by the wallet owner.
pub const W5_AUTH_SIGNED_EXTERNAL: u32 = 0x7369_676e;

/// Prefix of a W5 internal message carrying an owner signature.
pub const W5_AUTH_SIGNED_INTERNAL: u32 = 0x7369_6e74;

pub const SIGNATURE_LEN: usize = 64;

/// Wallet id the contract expects in every signed payload.
pub fn wallet_id(version: WalletVersion, network: Network, workchain: i8, subwallet_id: Option<u32>) -> u32 {
    if let Some(id) = subwallet_id {
        return id;
    }
    match version {
        WalletVersion::V3R2 | WalletVersion::V4R2 => {
            DEFAULT_WALLET_ID.wrapping_add(workchain as i32 as u32)
        }
        WalletVersion::W5 => {
            let global_id: i32 = match network {
                Network::Mainnet => -239,
                Network::Testnet => -3,
            };
            let context = (1u32 << 31) | (((workchain as u8) as u32) << 23);
            (global_id as u32) ^ context
        }
    }
}

/// Parameters fixed before a transfer is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub version: WalletVersion,
    pub wallet_id: u32,
    pub valid_until: u32,
}

/// Build the payload a wallet owner signs.
///
/// For [`WalletVersion::W5`] the messages are written in reverse order; the
/// W5 action list is executed back to front.
pub fn signing_payload(intent: &TransactionIntent, params: &TransferParams) -> Vec<u8> {
    let mut writer = BodyWriter::default();
    writer
        .put_u32(params.wallet_id)
        .put_u32(params.valid_until)
        .put_u32(intent.seqno);

    match params.version {
        WalletVersion::V3R2 => {}
        WalletVersion::V4R2 => {
            writer.put_u8(0);
        }
        WalletVersion::W5 => {
            writer.put_u32(match intent.auth_type {
                AuthType::External => W5_AUTH_SIGNED_EXTERNAL,
                AuthType::Internal => W5_AUTH_SIGNED_INTERNAL,
            });
        }
    }

    if params.version == WalletVersion::W5 {
        for message in intent.messages.iter().rev() {
            put_message(&mut writer, intent.send_mode, message);
        }
    } else {
        for message in &intent.messages {
            put_message(&mut writer, intent.send_mode, message);
        }
    }

    writer.finish()
}

fn put_message(writer: &mut BodyWriter, send_mode: u8, message: &Message) {
    writer
        .put_u8(send_mode)
        .put_address(&message.destination)
        .put_u8(message.bounceable as u8)
        .put_u128(message.value)
        .put_optional(message.state_init.as_deref())
        .put_optional(message.body.as_deref());
}

/// Hash the wallet contract checks the signature against.
pub fn signing_hash(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}

/// A signed external message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub bytes: Vec<u8>,
    pub seqno: u32,
    pub valid_until: u32,
}

impl SignedTransfer {
    pub fn assemble(
        version: WalletVersion,
        payload: Vec<u8>,
        signature: &[u8; SIGNATURE_LEN],
        seqno: u32,
        valid_until: u32,
    ) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + SIGNATURE_LEN);
        if version == WalletVersion::W5 {
            bytes.extend_from_slice(&payload);
            bytes.extend_from_slice(signature);
        } else {
            bytes.extend_from_slice(signature);
            bytes.extend_from_slice(&payload);
        }
        Self {
            bytes,
            seqno,
            valid_until,
        }
    }

    /// Hex sha256 of the external message, used to track it after submission.
    pub fn message_hash(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::address::Address;
    use crate::blockchain::types::SEND_MODE_DEFAULT;

    fn message(byte: u8, value: u128) -> Message {
        Message {
            destination: Address::new(0, [byte; 32]),
            value,
            bounceable: false,
            state_init: None,
            body: None,
        }
    }

    fn two_message_intent() -> TransactionIntent {
        TransactionIntent {
            messages: vec![message(1, 10), message(2, 20)],
            auth_type: Default::default(),
            seqno: 5,
            valid_until: Some(1_000),
            send_mode: SEND_MODE_DEFAULT,
            hints: Default::default(),
        }
    }

    fn params(version: WalletVersion) -> TransferParams {
        TransferParams {
            version,
            wallet_id: wallet_id(version, Network::Mainnet, 0, None),
            valid_until: 1_000,
        }
    }

    #[test]
    fn test_w5_reverses_message_order() {
        let intent = two_message_intent();
        let payload = signing_payload(&intent, &params(WalletVersion::W5));
        // header: wallet id, valid until, seqno, auth prefix
        let first_destination = &payload[16 + 2..16 + 2 + 32];
        assert_eq!(first_destination, &[2u8; 32]);
    }

    #[test]
    fn test_v4_keeps_message_order() {
        let intent = two_message_intent();
        let payload = signing_payload(&intent, &params(WalletVersion::V4R2));
        // header: wallet id, valid until, seqno, op
        let first_destination = &payload[13 + 2..13 + 2 + 32];
        assert_eq!(first_destination, &[1u8; 32]);
    }

    #[test]
    fn test_wallet_ids() {
        assert_eq!(wallet_id(WalletVersion::V4R2, Network::Mainnet, 0, None), DEFAULT_WALLET_ID);
        assert_eq!(wallet_id(WalletVersion::V3R2, Network::Testnet, 0, Some(42)), 42);
        assert_eq!(wallet_id(WalletVersion::W5, Network::Mainnet, 0, None), 2_147_483_409);
    }

    #[test]
    fn test_signature_placement() {
        let signature = [7u8; SIGNATURE_LEN];
        let w5 = SignedTransfer::assemble(WalletVersion::W5, vec![1, 2], &signature, 0, 0);
        assert_eq!(&w5.bytes[..2], &[1, 2]);
        let v4 = SignedTransfer::assemble(WalletVersion::V4R2, vec![1, 2], &signature, 0, 0);
        assert_eq!(&v4.bytes[..SIGNATURE_LEN], &signature);
    }
}
