//! Message body layout.
//!
//! Bodies use a flat big-endian layout: a 32-bit opcode followed by the
//! opcode's fields. Optional byte fields are a presence flag, a 32-bit length
//! and the bytes. Addresses are 33 bytes (workchain then hash).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::address::Address;

pub mod op {
    pub const COMMENT: u32 = 0x0000_0000;
    pub const JETTON_TRANSFER: u32 = 0x0f8a_7ea5;
    pub const NFT_TRANSFER: u32 = 0x5fcc_3d14;
    pub const JETTON_BURN: u32 = 0x595f_07bc;
    pub const ADD_WHITELIST: u32 = 0x7258_a69b;
    pub const SINGLE_NOMINATOR_WITHDRAW: u32 = 0x0000_1000;
    pub const SINGLE_NOMINATOR_CHANGE_VALIDATOR: u32 = 0x0000_1001;
    pub const TONSTAKERS_DEPOSIT: u32 = 0x47d5_4391;
    pub const VOTE_FOR_PROPOSAL: u32 = 0x69fb_306c;
    pub const CHANGE_DNS_RECORD: u32 = 0x4eb1_f0f9;
    pub const TOKEN_BRIDGE_PAY_SWAP: u32 = 0x0000_0008;
    pub const TONWHALES_POOL_DEPOSIT: u32 = 0x7bcd_1fef;
    pub const TONWHALES_POOL_WITHDRAW: u32 = 0xda80_3efd;
    pub const VESTING_SEND_MSG_COMMENT: u32 = 0xa773_3acd;
    pub const ENCRYPTED_COMMENT: u32 = 0x2167_da4b;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyError {
    #[error("Body truncated at offset {0}")]
    Truncated(usize),

    #[error("Invalid presence flag {0}")]
    InvalidFlag(u8),

    #[error("Comment is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Default)]
pub struct BodyWriter {
    buf: Vec<u8>,
}

impl BodyWriter {
    pub fn new(opcode: u32) -> Self {
        let mut writer = Self::default();
        writer.put_u32(opcode);
        writer
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_u128(&mut self, value: u128) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_address(&mut self, address: &Address) -> &mut Self {
        self.buf.extend_from_slice(&address.to_bytes());
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_optional(&mut self, bytes: Option<&[u8]>) -> &mut Self {
        match bytes {
            Some(bytes) => {
                self.put_u8(1);
                self.put_u32(bytes.len() as u32);
                self.buf.extend_from_slice(bytes);
            }
            None => {
                self.put_u8(0);
            }
        }
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct BodyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BodyError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(BodyError::Truncated(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BodyError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, BodyError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, BodyError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, BodyError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, BodyError> {
        Ok(u128::from_be_bytes(self.read_array()?))
    }

    pub fn read_address(&mut self) -> Result<Address, BodyError> {
        Ok(Address::from_bytes(&self.read_array()?))
    }

    pub fn read_optional(&mut self) -> Result<Option<Vec<u8>>, BodyError> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => {
                let len = self.read_u32()? as usize;
                Ok(Some(self.take(len)?.to_vec()))
            }
            flag => Err(BodyError::InvalidFlag(flag)),
        }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Plain text comment body.
pub fn comment_body(text: &str) -> Vec<u8> {
    let mut writer = BodyWriter::new(op::COMMENT);
    writer.put_bytes(text.as_bytes());
    writer.finish()
}

/// Encrypted comment body wrapping the output of comment encryption.
pub fn encrypted_comment_body(encrypted: &[u8]) -> Vec<u8> {
    let mut writer = BodyWriter::new(op::ENCRYPTED_COMMENT);
    writer.put_bytes(encrypted);
    writer.finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JettonTransferBody {
    pub query_id: u64,
    pub amount: u128,
    pub destination: Address,
    pub response_destination: Address,
    pub custom_payload: Option<Vec<u8>>,
    pub forward_amount: u128,
    pub forward_payload: Option<Vec<u8>>,
}

impl JettonTransferBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BodyWriter::new(op::JETTON_TRANSFER);
        writer
            .put_u64(self.query_id)
            .put_u128(self.amount)
            .put_address(&self.destination)
            .put_address(&self.response_destination)
            .put_optional(self.custom_payload.as_deref())
            .put_u128(self.forward_amount)
            .put_optional(self.forward_payload.as_deref());
        writer.finish()
    }

    /// Decode the fields following the opcode.
    pub fn decode(reader: &mut BodyReader<'_>) -> Result<Self, BodyError> {
        Ok(Self {
            query_id: reader.read_u64()?,
            amount: reader.read_u128()?,
            destination: reader.read_address()?,
            response_destination: reader.read_address()?,
            custom_payload: reader.read_optional()?,
            forward_amount: reader.read_u128()?,
            forward_payload: reader.read_optional()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransferBody {
    pub query_id: u64,
    pub new_owner: Address,
    pub response_destination: Address,
    pub custom_payload: Option<Vec<u8>>,
    pub forward_amount: u128,
    pub forward_payload: Option<Vec<u8>>,
}

impl NftTransferBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BodyWriter::new(op::NFT_TRANSFER);
        writer
            .put_u64(self.query_id)
            .put_address(&self.new_owner)
            .put_address(&self.response_destination)
            .put_optional(self.custom_payload.as_deref())
            .put_u128(self.forward_amount)
            .put_optional(self.forward_payload.as_deref());
        writer.finish()
    }

    pub fn decode(reader: &mut BodyReader<'_>) -> Result<Self, BodyError> {
        Ok(Self {
            query_id: reader.read_u64()?,
            new_owner: reader.read_address()?,
            response_destination: reader.read_address()?,
            custom_payload: reader.read_optional()?,
            forward_amount: reader.read_u128()?,
            forward_payload: reader.read_optional()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JettonBurnBody {
    pub query_id: u64,
    pub amount: u128,
    pub response_destination: Address,
    pub custom_payload: Option<Vec<u8>>,
}

impl JettonBurnBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BodyWriter::new(op::JETTON_BURN);
        writer
            .put_u64(self.query_id)
            .put_u128(self.amount)
            .put_address(&self.response_destination)
            .put_optional(self.custom_payload.as_deref());
        writer.finish()
    }

    pub fn decode(reader: &mut BodyReader<'_>) -> Result<Self, BodyError> {
        Ok(Self {
            query_id: reader.read_u64()?,
            amount: reader.read_u128()?,
            response_destination: reader.read_address()?,
            custom_payload: reader.read_optional()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDnsRecordBody {
    pub query_id: u64,
    /// sha256 of the record name.
    pub key: [u8; 32],
    /// `None` deletes the record.
    pub value: Option<Vec<u8>>,
}

impl ChangeDnsRecordBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BodyWriter::new(op::CHANGE_DNS_RECORD);
        writer
            .put_u64(self.query_id)
            .put_bytes(&self.key)
            .put_optional(self.value.as_deref());
        writer.finish()
    }

    pub fn decode(reader: &mut BodyReader<'_>) -> Result<Self, BodyError> {
        Ok(Self {
            query_id: reader.read_u64()?,
            key: reader.read_array()?,
            value: reader.read_optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jetton_transfer_layout() {
        let body = JettonTransferBody {
            query_id: 7,
            amount: 1_000_000,
            destination: Address::new(0, [1u8; 32]),
            response_destination: Address::new(0, [2u8; 32]),
            custom_payload: None,
            forward_amount: 1,
            forward_payload: Some(comment_body("hi")),
        };
        let encoded = body.encode();
        assert_eq!(&encoded[..4], &op::JETTON_TRANSFER.to_be_bytes());

        let mut reader = BodyReader::new(&encoded);
        assert_eq!(reader.read_u32().unwrap(), op::JETTON_TRANSFER);
        let decoded = JettonTransferBody::decode(&mut reader).unwrap();
        assert_eq!(decoded, body);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_body() {
        let mut reader = BodyReader::new(&[0, 0, 0]);
        assert_eq!(reader.read_u32(), Err(BodyError::Truncated(0)));
    }

    #[test]
    fn test_invalid_presence_flag() {
        let mut reader = BodyReader::new(&[2]);
        assert_eq!(reader.read_optional(), Err(BodyError::InvalidFlag(2)));
    }
}
