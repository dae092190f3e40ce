//! Device-legible interpretations of message bodies.

use serde::Serialize;

use crate::blockchain::body::{
    BodyWriter, ChangeDnsRecordBody, JettonBurnBody, JettonTransferBody, NftTransferBody,
};
use crate::ledger::capabilities::Feature;

/// Token identification attached to a jetton transfer.
///
/// `Unset` means nobody looked the token up; `NotFound` means it was looked
/// up and the device has no name for it. The device app treats them
/// differently, so they are never collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum JettonIdentification {
    #[default]
    Unset,
    NotFound,
    #[serde(rename_all = "camelCase")]
    Known { jetton_id: u32, workchain: i8 },
}

/// Query id plus the remaining opcode-specific fields, passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpFields {
    pub query_id: u64,
    pub fields: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DevicePayload {
    Comment {
        text: String,
    },
    JettonTransfer {
        #[serde(flatten)]
        body: JettonTransferBody,
        known_jetton: JettonIdentification,
    },
    NftTransfer(NftTransferBody),
    JettonBurn(JettonBurnBody),
    ChangeDnsRecord(ChangeDnsRecordBody),
    AddWhitelist(OpFields),
    SingleNominatorWithdraw(OpFields),
    SingleNominatorChangeValidator(OpFields),
    TonstakersDeposit(OpFields),
    VoteForProposal(OpFields),
    TokenBridgePaySwap(OpFields),
    TonwhalesPoolDeposit(OpFields),
    TonwhalesPoolWithdraw(OpFields),
    VestingSendMsgComment(OpFields),
    /// Raw body the device can only show as a hash; needs blind signing.
    Unsafe {
        body: Vec<u8>,
    },
}

impl DevicePayload {
    pub fn feature(&self) -> Feature {
        match self {
            DevicePayload::Comment { .. } => Feature::Comment,
            DevicePayload::JettonTransfer { .. } => Feature::JettonTransfer,
            DevicePayload::NftTransfer(_) => Feature::NftTransfer,
            DevicePayload::JettonBurn(_) => Feature::JettonBurn,
            DevicePayload::ChangeDnsRecord(_) => Feature::ChangeDnsRecord,
            DevicePayload::AddWhitelist(_) => Feature::AddWhitelist,
            DevicePayload::SingleNominatorWithdraw(_) => Feature::SingleNominatorWithdraw,
            DevicePayload::SingleNominatorChangeValidator(_) => Feature::SingleNominatorChangeValidator,
            DevicePayload::TonstakersDeposit(_) => Feature::TonstakersDeposit,
            DevicePayload::VoteForProposal(_) => Feature::VoteForProposal,
            DevicePayload::TokenBridgePaySwap(_) => Feature::TokenBridgePaySwap,
            DevicePayload::TonwhalesPoolDeposit(_) => Feature::TonwhalesPoolDeposit,
            DevicePayload::TonwhalesPoolWithdraw(_) => Feature::TonwhalesPoolWithdraw,
            DevicePayload::VestingSendMsgComment(_) => Feature::VestingSendMsgComment,
            DevicePayload::Unsafe { .. } => Feature::Unsafe,
        }
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, DevicePayload::Unsafe { .. })
    }

    /// Device-side payload type code.
    fn type_code(&self) -> u8 {
        match self {
            DevicePayload::Comment { .. } => 0x00,
            DevicePayload::JettonTransfer { .. } => 0x01,
            DevicePayload::NftTransfer(_) => 0x02,
            DevicePayload::JettonBurn(_) => 0x03,
            DevicePayload::AddWhitelist(_) => 0x04,
            DevicePayload::SingleNominatorWithdraw(_) => 0x05,
            DevicePayload::SingleNominatorChangeValidator(_) => 0x06,
            DevicePayload::TonstakersDeposit(_) => 0x07,
            DevicePayload::VoteForProposal(_) => 0x08,
            DevicePayload::ChangeDnsRecord(_) => 0x09,
            DevicePayload::TokenBridgePaySwap(_) => 0x0a,
            DevicePayload::TonwhalesPoolDeposit(_) => 0x0b,
            DevicePayload::TonwhalesPoolWithdraw(_) => 0x0c,
            DevicePayload::VestingSendMsgComment(_) => 0x0d,
            DevicePayload::Unsafe { .. } => 0x0e,
        }
    }

    /// Append the sign-request encoding: type code then a length-prefixed blob.
    pub fn write_to(&self, writer: &mut BodyWriter) {
        let blob = match self {
            DevicePayload::Comment { text } => text.as_bytes().to_vec(),
            DevicePayload::JettonTransfer { body, known_jetton } => {
                let mut blob = strip_opcode(body.encode());
                match known_jetton {
                    JettonIdentification::Unset => blob.push(0),
                    JettonIdentification::NotFound => blob.push(1),
                    JettonIdentification::Known { jetton_id, workchain } => {
                        blob.push(2);
                        blob.extend_from_slice(&jetton_id.to_be_bytes());
                        blob.push(*workchain as u8);
                    }
                }
                blob
            }
            DevicePayload::NftTransfer(body) => strip_opcode(body.encode()),
            DevicePayload::JettonBurn(body) => strip_opcode(body.encode()),
            DevicePayload::ChangeDnsRecord(body) => strip_opcode(body.encode()),
            DevicePayload::AddWhitelist(fields)
            | DevicePayload::SingleNominatorWithdraw(fields)
            | DevicePayload::SingleNominatorChangeValidator(fields)
            | DevicePayload::TonstakersDeposit(fields)
            | DevicePayload::VoteForProposal(fields)
            | DevicePayload::TokenBridgePaySwap(fields)
            | DevicePayload::TonwhalesPoolDeposit(fields)
            | DevicePayload::TonwhalesPoolWithdraw(fields)
            | DevicePayload::VestingSendMsgComment(fields) => {
                let mut blob = fields.query_id.to_be_bytes().to_vec();
                blob.extend_from_slice(&fields.fields);
                blob
            }
            DevicePayload::Unsafe { body } => body.clone(),
        };
        writer.put_u8(self.type_code()).put_optional(Some(&blob));
    }
}

fn strip_opcode(mut encoded: Vec<u8>) -> Vec<u8> {
    encoded.drain(..4);
    encoded
}
