//! Body parsing into device payload variants.

use thiserror::Error;

use crate::blockchain::body::{
    op, BodyError, BodyReader, ChangeDnsRecordBody, JettonBurnBody, JettonTransferBody,
    NftTransferBody,
};
use crate::ledger::payload::{DevicePayload, JettonIdentification, OpFields};

/// Longest comment the device app will display.
pub const MAX_DEVICE_COMMENT_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown opcode 0x{0:08x}")]
    UnknownOpcode(u32),

    #[error("Comment too long for device ({0} bytes)")]
    CommentTooLong(usize),

    #[error("Comment byte 0x{0:02x} is not printable ASCII")]
    CommentNotPrintable(u8),

    #[error("Trailing {0} bytes after body")]
    TrailingBytes(usize),

    #[error(transparent)]
    Body(#[from] BodyError),
}

/// Turns a raw message body into a structured payload.
///
/// A failure here is not fatal to signing: the translator falls back to an
/// unsafe payload.
pub trait PayloadParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<DevicePayload, ParseError>;
}

/// Recognises the opcodes the TON device app has screens for.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpcodeParser;

impl PayloadParser for OpcodeParser {
    fn parse(&self, body: &[u8]) -> Result<DevicePayload, ParseError> {
        let mut reader = BodyReader::new(body);
        let opcode = reader.read_u32()?;

        let payload = match opcode {
            op::COMMENT => {
                let text = reader.rest();
                if text.len() > MAX_DEVICE_COMMENT_LEN {
                    return Err(ParseError::CommentTooLong(text.len()));
                }
                if let Some(byte) = text.iter().find(|b| !(0x20..=0x7e).contains(*b)) {
                    return Err(ParseError::CommentNotPrintable(*byte));
                }
                let text = std::str::from_utf8(text).map_err(|_| BodyError::InvalidUtf8)?;
                DevicePayload::Comment {
                    text: text.to_string(),
                }
            }
            op::JETTON_TRANSFER => DevicePayload::JettonTransfer {
                body: JettonTransferBody::decode(&mut reader)?,
                known_jetton: JettonIdentification::Unset,
            },
            op::NFT_TRANSFER => DevicePayload::NftTransfer(NftTransferBody::decode(&mut reader)?),
            op::JETTON_BURN => DevicePayload::JettonBurn(JettonBurnBody::decode(&mut reader)?),
            op::CHANGE_DNS_RECORD => {
                DevicePayload::ChangeDnsRecord(ChangeDnsRecordBody::decode(&mut reader)?)
            }
            op::ADD_WHITELIST => DevicePayload::AddWhitelist(op_fields(&mut reader)?),
            op::SINGLE_NOMINATOR_WITHDRAW => {
                DevicePayload::SingleNominatorWithdraw(op_fields(&mut reader)?)
            }
            op::SINGLE_NOMINATOR_CHANGE_VALIDATOR => {
                DevicePayload::SingleNominatorChangeValidator(op_fields(&mut reader)?)
            }
            op::TONSTAKERS_DEPOSIT => DevicePayload::TonstakersDeposit(op_fields(&mut reader)?),
            op::VOTE_FOR_PROPOSAL => DevicePayload::VoteForProposal(op_fields(&mut reader)?),
            op::TOKEN_BRIDGE_PAY_SWAP => DevicePayload::TokenBridgePaySwap(op_fields(&mut reader)?),
            op::TONWHALES_POOL_DEPOSIT => {
                DevicePayload::TonwhalesPoolDeposit(op_fields(&mut reader)?)
            }
            op::TONWHALES_POOL_WITHDRAW => {
                DevicePayload::TonwhalesPoolWithdraw(op_fields(&mut reader)?)
            }
            op::VESTING_SEND_MSG_COMMENT => {
                DevicePayload::VestingSendMsgComment(op_fields(&mut reader)?)
            }
            other => return Err(ParseError::UnknownOpcode(other)),
        };

        let trailing = reader.rest().len();
        if trailing > 0 {
            return Err(ParseError::TrailingBytes(trailing));
        }
        Ok(payload)
    }
}

fn op_fields(reader: &mut BodyReader<'_>) -> Result<OpFields, ParseError> {
    Ok(OpFields {
        query_id: reader.read_u64()?,
        fields: reader.rest().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::address::Address;
    use crate::blockchain::body::{comment_body, BodyWriter};

    #[test]
    fn test_parses_comment() {
        let parsed = OpcodeParser.parse(&comment_body("gm")).unwrap();
        assert_eq!(parsed, DevicePayload::Comment { text: "gm".into() });
    }

    #[test]
    fn test_long_comment_is_rejected() {
        let text = "x".repeat(MAX_DEVICE_COMMENT_LEN + 1);
        assert_eq!(
            OpcodeParser.parse(&comment_body(&text)),
            Err(ParseError::CommentTooLong(121))
        );
    }

    #[test]
    fn test_non_printable_comment_is_rejected() {
        assert_eq!(
            OpcodeParser.parse(&comment_body("line\nbreak")),
            Err(ParseError::CommentNotPrintable(b'\n'))
        );
        assert_eq!(
            OpcodeParser.parse(&comment_body("café")),
            Err(ParseError::CommentNotPrintable(0xc3))
        );
        assert!(OpcodeParser.parse(&comment_body("~ ok! ~")).is_ok());
    }

    #[test]
    fn test_jetton_transfer_starts_unset() {
        let body = JettonTransferBody {
            query_id: 1,
            amount: 10,
            destination: Address::new(0, [3; 32]),
            response_destination: Address::new(0, [4; 32]),
            custom_payload: None,
            forward_amount: 0,
            forward_payload: None,
        };
        match OpcodeParser.parse(&body.encode()).unwrap() {
            DevicePayload::JettonTransfer {
                body: parsed,
                known_jetton,
            } => {
                assert_eq!(parsed, body);
                assert_eq!(known_jetton, JettonIdentification::Unset);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_op_fields_keep_tail() {
        let mut writer = BodyWriter::new(op::TONWHALES_POOL_DEPOSIT);
        writer.put_u64(9).put_u128(5);
        let parsed = OpcodeParser.parse(&writer.finish()).unwrap();
        match parsed {
            DevicePayload::TonwhalesPoolDeposit(fields) => {
                assert_eq!(fields.query_id, 9);
                assert_eq!(fields.fields.len(), 16);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_truncated() {
        assert_eq!(
            OpcodeParser.parse(&0xdead_beefu32.to_be_bytes()),
            Err(ParseError::UnknownOpcode(0xdead_beef))
        );
        assert!(matches!(
            OpcodeParser.parse(&op::JETTON_TRANSFER.to_be_bytes()),
            Err(ParseError::Body(BodyError::Truncated(_)))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut encoded = JettonBurnBody {
            query_id: 0,
            amount: 1,
            response_destination: Address::new(0, [1; 32]),
            custom_payload: None,
        }
        .encode();
        encoded.push(0xff);
        assert_eq!(OpcodeParser.parse(&encoded), Err(ParseError::TrailingBytes(1)));
    }
}
