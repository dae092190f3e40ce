//! Chain-level types shared by signing, drafting and activity code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::blockchain::address::Address;

/// How long a signed transfer stays valid when the caller gives no timeout.
pub const TRANSFER_TIMEOUT_SEC: u32 = 600;

/// Default send mode: pay fees separately and ignore action-phase errors.
pub const SEND_MODE_DEFAULT: u8 = 3;

/// Send the whole remaining balance; the fee is taken from the amount.
pub const SEND_MODE_CARRY_ALL_BALANCE: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ton,
    Tron,
}

/// TON wallet contract versions this core can sign for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletVersion {
    #[serde(rename = "v3R2")]
    V3R2,
    #[serde(rename = "v4R2")]
    V4R2,
    /// Wallet v5r1. Batches internal messages in a single action list.
    #[serde(rename = "W5")]
    W5,
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletVersion::V3R2 => write!(f, "v3R2"),
            WalletVersion::V4R2 => write!(f, "v4R2"),
            WalletVersion::W5 => write!(f, "W5"),
        }
    }
}

/// The TON wallet bound to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonWallet {
    pub address: Address,
    /// Hex-encoded ed25519 public key. View-only accounts may not know it.
    #[serde(default)]
    pub public_key: Option<String>,
    pub version: WalletVersion,
    #[serde(default)]
    pub is_initialized: bool,
}

impl TonWallet {
    pub fn public_key_bytes(&self) -> Option<[u8; 32]> {
        let hex_key = self.public_key.as_deref()?;
        hex::decode(hex_key).ok()?.try_into().ok()
    }
}

/// What backs an account's key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AccountKind {
    Mnemonic,
    Ledger {
        /// Derivation index on the device.
        index: u32,
        /// Non-default wallet id, used by vesting contracts.
        #[serde(default, rename = "subwalletId")]
        subwallet_id: Option<u32>,
    },
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub network: Network,
    pub kind: AccountKind,
    pub ton: TonWallet,
}

/// Who authorizes the transfer. Only external (user-signed) messages are in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    External,
    Internal,
}

/// A single outgoing internal message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub destination: Address,
    /// Amount in nanotons.
    pub value: u128,
    pub bounceable: bool,
    #[serde(default)]
    pub state_init: Option<Vec<u8>>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

/// Caller-provided facts that save lookups while signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentHints {
    /// Master address of the token moved by a jetton transfer body.
    #[serde(default)]
    pub token_address: Option<Address>,
}

/// Everything needed to sign one wallet transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIntent {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub auth_type: AuthType,
    pub seqno: u32,
    /// Unix seconds after which the transfer is rejected by the wallet.
    #[serde(default)]
    pub valid_until: Option<u32>,
    pub send_mode: u8,
    #[serde(default)]
    pub hints: IntentHints,
}

impl TransactionIntent {
    pub fn single(message: Message, seqno: u32) -> Self {
        Self {
            messages: vec![message],
            auth_type: AuthType::External,
            seqno,
            valid_until: None,
            send_mode: SEND_MODE_DEFAULT,
            hints: IntentHints::default(),
        }
    }

    /// The expiry to sign with, falling back to now + [`TRANSFER_TIMEOUT_SEC`].
    pub fn expires_at(&self) -> u32 {
        self.valid_until
            .unwrap_or_else(|| unix_now_secs().saturating_add(TRANSFER_TIMEOUT_SEC))
    }
}

pub fn unix_now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

pub fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_version_serde_names() {
        let json = serde_json::to_string(&WalletVersion::W5).unwrap();
        assert_eq!(json, "\"W5\"");
        let parsed: WalletVersion = serde_json::from_str("\"v3R2\"").unwrap();
        assert_eq!(parsed, WalletVersion::V3R2);
    }

    #[test]
    fn test_account_kind_tagging() {
        let kind: AccountKind =
            serde_json::from_str(r#"{"type":"ledger","index":2,"subwalletId":7}"#).unwrap();
        assert_eq!(
            kind,
            AccountKind::Ledger {
                index: 2,
                subwallet_id: Some(7)
            }
        );
    }

    #[test]
    fn test_expires_at_fallback() {
        let address = Address::new(0, [1u8; 32]);
        let message = Message {
            destination: address,
            value: 1,
            bounceable: true,
            state_init: None,
            body: None,
        };
        let mut intent = TransactionIntent::single(message, 1);
        let now = unix_now_secs();
        let fallback = intent.expires_at();
        assert!(fallback >= now + TRANSFER_TIMEOUT_SEC);

        intent.valid_until = Some(42);
        assert_eq!(intent.expires_at(), 42);
    }

    #[test]
    fn test_public_key_bytes() {
        let wallet = TonWallet {
            address: Address::new(0, [0u8; 32]),
            public_key: Some(hex::encode([9u8; 32])),
            version: WalletVersion::V4R2,
            is_initialized: true,
        };
        assert_eq!(wallet.public_key_bytes(), Some([9u8; 32]));
    }
}
