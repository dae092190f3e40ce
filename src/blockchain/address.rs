//! Account addresses for the supported chains.
//!
//! TON addresses come in two encodings: the raw `workchain:hex` form and the
//! 48-character user-friendly form (base64 of tag, workchain, hash and a
//! CRC16 checksum). TRON addresses are base58check over a `0x41`-prefixed
//! 20-byte account id.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TEST_ONLY: u8 = 0x80;
const FRIENDLY_LEN: usize = 48;
const TRON_PREFIX: u8 = 0x41;

/// Errors produced while parsing addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Address has invalid length {0}")]
    InvalidLength(usize),

    #[error("Address is not valid base64")]
    InvalidEncoding,

    #[error("Address checksum mismatch")]
    ChecksumMismatch,

    #[error("Unknown address tag {0:#04x}")]
    UnknownTag(u8),

    #[error("Invalid raw address: {0}")]
    InvalidRaw(String),
}

/// A TON account address with the flags carried by its user-friendly form.
///
/// Equality and hashing only consider the workchain and account hash, so the
/// bounceable and test-only variants of one account compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    workchain: i8,
    hash: [u8; 32],
    bounceable: bool,
    test_only: bool,
    user_friendly: bool,
    url_safe: bool,
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: true,
            test_only: false,
            user_friendly: false,
            url_safe: true,
        }
    }

    /// Parse either the raw or the user-friendly form.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.contains(':') {
            return Self::parse_raw(input);
        }
        Self::parse_friendly(input)
    }

    fn parse_raw(input: &str) -> Result<Self, AddressError> {
        let (wc, hash_hex) = input
            .split_once(':')
            .ok_or_else(|| AddressError::InvalidRaw(input.to_string()))?;
        let workchain: i8 = wc
            .parse()
            .map_err(|_| AddressError::InvalidRaw(input.to_string()))?;
        let bytes = hex::decode(hash_hex).map_err(|_| AddressError::InvalidRaw(input.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidRaw(input.to_string()))?;
        Ok(Self::new(workchain, hash))
    }

    fn parse_friendly(input: &str) -> Result<Self, AddressError> {
        if input.len() != FRIENDLY_LEN {
            return Err(AddressError::InvalidLength(input.len()));
        }
        let url_safe = !input.contains(['+', '/', '=']);
        let decoded = if url_safe {
            URL_SAFE.decode(input)
        } else {
            STANDARD.decode(input)
        }
        .map_err(|_| AddressError::InvalidEncoding)?;
        if decoded.len() != 36 {
            return Err(AddressError::InvalidLength(decoded.len()));
        }

        let checksum = u16::from_be_bytes([decoded[34], decoded[35]]);
        if crc16(&decoded[..34]) != checksum {
            return Err(AddressError::ChecksumMismatch);
        }

        let mut tag = decoded[0];
        let test_only = tag & FLAG_TEST_ONLY != 0;
        tag &= !FLAG_TEST_ONLY;
        let bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => return Err(AddressError::UnknownTag(other)),
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&decoded[2..34]);

        Ok(Self {
            workchain: decoded[1] as i8,
            hash,
            bounceable,
            test_only,
            user_friendly: true,
            url_safe,
        })
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn is_bounceable(&self) -> bool {
        self.bounceable
    }

    pub fn is_test_only(&self) -> bool {
        self.test_only
    }

    /// Whether the address was given in the user-friendly form.
    pub fn is_user_friendly(&self) -> bool {
        self.user_friendly
    }

    /// Whether the user-friendly form avoided the `+`, `/` and `=` characters.
    pub fn is_url_safe(&self) -> bool {
        self.url_safe
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// Encode as url-safe user-friendly form with the given flags.
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if test_only {
            tag |= FLAG_TEST_ONLY;
        }
        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        URL_SAFE.encode(bytes)
    }

    /// Flat 33-byte encoding: workchain followed by the account hash.
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = self.workchain as u8;
        out[1..].copy_from_slice(&self.hash);
        out
    }

    pub fn from_bytes(bytes: &[u8; 33]) -> Self {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[1..]);
        Self::new(bytes[0] as i8, hash)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user_friendly {
            write!(f, "{}", self.to_friendly(self.bounceable, self.test_only))
        } else {
            write!(f, "{}", self.to_raw())
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// CRC16/XMODEM as used by the TON address checksum.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// A TRON base58check address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TronAddress {
    account: [u8; 20],
}

impl TronAddress {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let decoded = bs58::decode(input)
            .into_vec()
            .map_err(|_| AddressError::InvalidEncoding)?;
        if decoded.len() != 25 {
            return Err(AddressError::InvalidLength(decoded.len()));
        }
        let (payload, checksum) = decoded.split_at(21);
        if double_sha256(payload)[..4] != *checksum {
            return Err(AddressError::ChecksumMismatch);
        }
        if payload[0] != TRON_PREFIX {
            return Err(AddressError::UnknownTag(payload[0]));
        }
        let mut account = [0u8; 20];
        account.copy_from_slice(&payload[1..]);
        Ok(Self { account })
    }

    pub fn from_account(account: [u8; 20]) -> Self {
        Self { account }
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(25);
        payload.push(TRON_PREFIX);
        payload.extend_from_slice(&self.account);
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        write!(f, "{}", bs58::encode(payload).into_string())
    }
}

impl TryFrom<String> for TronAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TronAddress> for String {
    fn from(address: TronAddress) -> Self {
        address.to_string()
    }
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT_MASTER: &str = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs";

    #[test]
    fn test_parse_friendly_address() {
        let address = Address::parse(USDT_MASTER).unwrap();
        assert_eq!(address.workchain(), 0);
        assert!(address.is_bounceable());
        assert!(!address.is_test_only());
        assert!(address.is_user_friendly());
        assert!(address.is_url_safe());
        assert_eq!(address.to_string(), USDT_MASTER);
        assert_eq!(
            address.to_raw(),
            "0:b113a994b5024a16719f69139328eb759596c38a25f59028b146fecdc3621dfe"
        );
    }

    #[test]
    fn test_raw_and_friendly_are_equal() {
        let friendly = Address::parse(USDT_MASTER).unwrap();
        let raw = Address::parse(&friendly.to_raw()).unwrap();
        assert_eq!(friendly, raw);
        assert!(!raw.is_user_friendly());
    }

    #[test]
    fn test_non_bounceable_and_test_only_flags() {
        let non_bounceable = Address::parse("UQABAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAZAm").unwrap();
        assert!(!non_bounceable.is_bounceable());

        let test_only = Address::parse("kQABAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAXZp").unwrap();
        assert!(test_only.is_test_only());
        assert!(test_only.is_bounceable());
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = Address::parse("EQABAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAc3k").unwrap_err();
        assert_eq!(err, AddressError::ChecksumMismatch);
    }

    #[test]
    fn test_standard_base64_is_not_url_safe() {
        let url_safe = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs";
        let standard = url_safe.replace('_', "/");
        let address = Address::parse(&standard).unwrap();
        assert!(!address.is_url_safe());
    }

    #[test]
    fn test_tron_address_roundtrip_and_checksum() {
        let address = TronAddress::from_account([7u8; 20]);
        let encoded = address.to_string();
        assert!(encoded.starts_with('T'));
        assert_eq!(TronAddress::parse(&encoded).unwrap(), address);

        let mut corrupted = encoded.clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'a' { 'b' } else { 'a' });
        assert!(!TronAddress::is_valid(&corrupted));
    }
}
