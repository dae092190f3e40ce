//! APDU framing over a byte-stream device channel.
//!
//! The USB/BLE transport lives outside this crate; it is injected as a
//! [`DeviceChannel`] that exchanges one command for one response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::retries::Retryable;

pub const CLA: u8 = 0xe0;

pub mod ins {
    pub const GET_VERSION: u8 = 0x03;
    pub const SIGN_TX: u8 = 0x06;
    pub const GET_PROOF: u8 = 0x08;
    pub const GET_SETTINGS: u8 = 0x0a;
}

/// More chunks of the same command follow.
pub const P2_MORE: u8 = 0x02;
pub const P2_LAST: u8 = 0x00;

pub const MAX_CHUNK_LEN: usize = 255;

pub mod sw {
    pub const OK: u16 = 0x9000;
    pub const DENY: u16 = 0x6985;
    pub const WRONG_DATA: u16 = 0x6a80;
    pub const INS_NOT_SUPPORTED: u16 = 0x6d00;
    pub const CLA_NOT_SUPPORTED: u16 = 0x6e00;
    pub const BLIND_SIGNING_DISABLED: u16 = 0xbd00;
    pub const PROOF_TOO_LARGE: u16 = 0xb00b;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceModel {
    NanoS,
    NanoSPlus,
    NanoX,
    Stax,
    Flex,
    Unknown,
}

impl DeviceModel {
    /// Whether the model can display known jetton names at all.
    ///
    /// An unknown model may be a Nano S, so it is treated as unable.
    pub fn supports_jetton_id(&self) -> bool {
        !matches!(self, DeviceModel::NanoS | DeviceModel::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    #[error("Device did not answer within {0}ms")]
    Timeout(u64),
}

/// Failures of a single device command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Rejected on device")]
    RejectedByUser,

    #[error("Blind signing is disabled on device")]
    BlindSigningRequired,

    #[error("Proof exceeds device limits")]
    ProofTooLarge,

    #[error("Wrong app open on device (status 0x{0:04x})")]
    WrongApp(u16),

    #[error("Device returned status 0x{0:04x}")]
    Status(u16),

    #[error("Malformed device response: {0}")]
    Malformed(String),

    #[error("Cancelled before sending to device")]
    Cancelled,
}

impl Retryable for DeviceError {
    fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Channel(_) | DeviceError::WrongApp(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl Apdu {
    pub fn new(ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla: CLA,
            ins,
            p1,
            p2,
            data,
        }
    }

    /// Split a command whose data exceeds one frame.
    ///
    /// Every chunk but the last carries [`P2_MORE`]. Empty data still yields
    /// one frame.
    pub fn chunked(ins: u8, p1: u8, data: &[u8]) -> Vec<Apdu> {
        if data.is_empty() {
            return vec![Apdu::new(ins, p1, P2_LAST, Vec::new())];
        }
        let chunks: Vec<&[u8]> = data.chunks(MAX_CHUNK_LEN).collect();
        let last = chunks.len() - 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let p2 = if i == last { P2_LAST } else { P2_MORE };
                Apdu::new(ins, p1, p2, chunk.to_vec())
            })
            .collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.data.len());
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        out.extend_from_slice(&self.data);
        out
    }
}

/// Separate the data from the trailing status word and map failures.
pub fn split_response(mut response: Vec<u8>) -> Result<Vec<u8>, DeviceError> {
    if response.len() < 2 {
        return Err(DeviceError::Malformed(format!(
            "response of {} bytes has no status word",
            response.len()
        )));
    }
    let status_at = response.len() - 2;
    let status = u16::from_be_bytes([response[status_at], response[status_at + 1]]);
    response.truncate(status_at);

    match status {
        sw::OK => Ok(response),
        sw::DENY => Err(DeviceError::RejectedByUser),
        sw::BLIND_SIGNING_DISABLED => Err(DeviceError::BlindSigningRequired),
        sw::PROOF_TOO_LARGE => Err(DeviceError::ProofTooLarge),
        sw::CLA_NOT_SUPPORTED | sw::INS_NOT_SUPPORTED => Err(DeviceError::WrongApp(status)),
        other => Err(DeviceError::Status(other)),
    }
}

#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Send one frame and return the raw response including its status word.
    async fn exchange(&self, apdu: &Apdu) -> Result<Vec<u8>, ChannelError>;

    fn device_model(&self) -> DeviceModel;
}
