//! Signer errors and outputs.

use thiserror::Error;

use crate::ledger::capabilities::Feature;
use crate::ledger::channel::{ChannelError, DeviceError};
use crate::ledger::translator::TranslateError;
use crate::ledger::version::DeviceVersion;
use crate::resilience::retries::Retryable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("Device firmware {actual} does not support {feature} (requires {required})")]
    UnsupportedByDevice {
        feature: Feature,
        required: DeviceVersion,
        actual: DeviceVersion,
    },

    #[error("Device signs one message per transfer, got {0}")]
    TooManyMessages(usize),

    #[error("Blind signing must be enabled on the device")]
    BlindSigningRequired,

    #[error("Rejected by user")]
    RejectedByUser,

    #[error("Proof is too large for the device")]
    ProofTooLarge,

    #[error("Device connection failed: {0}")]
    Connection(String),

    #[error("Wrong device or app (status 0x{0:04x})")]
    WrongDevice(u16),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password required for mnemonic accounts")]
    PasswordRequired,

    #[error("{0} is not supported by this signer")]
    UnsupportedByBackend(&'static str),

    #[error("Wallet {0} does not support non-external auth")]
    UnsupportedAuthType(String),

    #[error("Failed to decrypt comment")]
    DecryptFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Vault error: {0}")]
    Vault(String),

    #[error("Unexpected device response: {0}")]
    DeviceResponse(String),
}

pub type SignResult<T> = Result<T, SignError>;

impl Retryable for SignError {
    fn is_retryable(&self) -> bool {
        matches!(self, SignError::Connection(_) | SignError::WrongDevice(_))
    }
}

impl From<TranslateError> for SignError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::UnsupportedByDevice {
                feature,
                required,
                actual,
            } => SignError::UnsupportedByDevice {
                feature,
                required,
                actual,
            },
            TranslateError::BlindSigningRequired => SignError::BlindSigningRequired,
        }
    }
}

impl From<DeviceError> for SignError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Channel(ChannelError::Disconnected(reason)) => SignError::Connection(reason),
            DeviceError::Channel(timeout @ ChannelError::Timeout(_)) => {
                SignError::Connection(timeout.to_string())
            }
            DeviceError::RejectedByUser => SignError::RejectedByUser,
            DeviceError::BlindSigningRequired => SignError::BlindSigningRequired,
            DeviceError::ProofTooLarge => SignError::ProofTooLarge,
            DeviceError::WrongApp(status) => SignError::WrongDevice(status),
            DeviceError::Status(status) => SignError::DeviceResponse(format!("status 0x{status:04x}")),
            DeviceError::Malformed(reason) => SignError::DeviceResponse(reason),
            DeviceError::Cancelled => SignError::Cancelled,
        }
    }
}
