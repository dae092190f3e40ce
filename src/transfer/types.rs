//! Draft request and result types.

use serde::{Deserialize, Serialize};

use crate::blockchain::address::Address;
use crate::blockchain::client::DieselStatus;

/// TON attached to a jetton transfer to pay the token wallet's gas.
pub const TOKEN_TRANSFER_AMOUNT: u128 = 50_000_000;
/// Part of [`TOKEN_TRANSFER_AMOUNT`] actually spent; the rest returns as excess.
pub const TOKEN_TRANSFER_REAL_AMOUNT: u128 = 30_000_000;
/// Forwarded to the recipient so they get a transfer notification.
pub const TOKEN_TRANSFER_FORWARD_AMOUNT: u128 = 1;
/// Rough network fee of a plain transfer.
pub const DEFAULT_FEE: u128 = 15_000_000;

/// Validation failures. These are results, not errors: the draft still
/// carries everything that was computed before the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftError {
    InvalidToAddress,
    InvalidAddressFormat,
    DomainNotResolved,
    InsufficientBalance,
    InactiveContract,
    InvalidStateInit,
    WalletNotInitialized,
}

/// Token moved by a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
    pub slug: String,
    /// Jetton master address.
    pub address: Address,
    #[serde(default)]
    pub is_gasless_enabled: bool,
    #[serde(default)]
    pub is_stars_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselDraft {
    pub status: DieselStatus,
    /// What the relayer charges, in token units (stars for a stars fee).
    pub amount: Option<u128>,
    /// TON the relayer covers.
    pub native_amount: u128,
    /// TON taken from the wallet's own balance.
    pub remaining_fee: u128,
    pub real_fee: u128,
}

impl DieselDraft {
    pub fn not_available() -> Self {
        Self {
            status: DieselStatus::NotAvailable,
            amount: None,
            native_amount: 0,
            remaining_fee: 0,
            real_fee: 0,
        }
    }

    /// Whether the transfer will go through the relayer.
    pub fn is_available(&self) -> bool {
        self.amount.is_some() && matches!(self.status, DieselStatus::Available | DieselStatus::StarsFee)
    }

    /// Tokens taken from the wallet for the relayer. Stars are paid elsewhere.
    pub fn token_amount(&self) -> u128 {
        match self.status {
            DieselStatus::Available => self.amount.unwrap_or(0),
            _ => 0,
        }
    }
}

/// Outcome of a transfer draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResult {
    pub fee: Option<u128>,
    pub real_fee: Option<u128>,
    pub diesel: Option<DieselDraft>,
    pub address_name: Option<String>,
    pub resolved_address: Option<String>,
    pub is_bounceable: bool,
    pub is_memo_required: bool,
    pub is_scam: bool,
    pub is_to_address_new: bool,
    pub error: Option<DraftError>,
}

impl DraftResult {
    pub fn with_error(mut self, error: DraftError) -> Self {
        self.error = Some(error);
        self
    }
}

/// TON transfer draft request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonDraftRequest {
    pub to_address: String,
    /// Nanotons, or token units when `token` is set.
    pub amount: u128,
    #[serde(default)]
    pub token: Option<TokenRef>,
    /// Message body, or the forward payload of a token transfer.
    #[serde(default)]
    pub payload: Option<Vec<u8>>,
    /// Base64 state init for deploying the destination.
    #[serde(default)]
    pub state_init: Option<String>,
    #[serde(default)]
    pub forward_amount: Option<u128>,
    #[serde(default)]
    pub allow_gasless: bool,
}

/// TRON transfer draft request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TronDraftRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: u128,
    /// TRC-20 contract; `None` for TRX.
    #[serde(default)]
    pub token_address: Option<String>,
}
