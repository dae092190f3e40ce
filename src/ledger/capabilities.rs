//! Firmware capability table.
//!
//! Each device-side feature maps to the first TON app version that supports
//! it. Adding a payload variant means adding one row here.

use serde::Serialize;
use std::fmt;

use crate::ledger::version::DeviceVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    Unsafe,
    Comment,
    JettonTransfer,
    NftTransfer,
    JettonBurn,
    AddWhitelist,
    SingleNominatorWithdraw,
    SingleNominatorChangeValidator,
    TonstakersDeposit,
    VoteForProposal,
    ChangeDnsRecord,
    TokenBridgePaySwap,
    TonwhalesPoolDeposit,
    TonwhalesPoolWithdraw,
    VestingSendMsgComment,
    GetSettings,
    WalletSpecifiers,
    /// Known jetton ids 0..=6.
    JettonIdV1,
    /// Known jetton ids 7..=9.
    JettonIdV2,
    /// Known jetton id 10.
    JettonIdV3,
}

const fn v(major: u32, minor: u32, patch: u32) -> DeviceVersion {
    DeviceVersion::new(major, minor, patch)
}

pub const CAPABILITIES: &[(Feature, DeviceVersion)] = &[
    (Feature::Unsafe, v(2, 1, 0)),
    (Feature::Comment, v(0, 0, 0)),
    (Feature::JettonTransfer, v(0, 0, 0)),
    (Feature::NftTransfer, v(2, 1, 0)),
    (Feature::JettonBurn, v(2, 1, 0)),
    (Feature::AddWhitelist, v(2, 1, 0)),
    (Feature::SingleNominatorWithdraw, v(2, 1, 0)),
    (Feature::SingleNominatorChangeValidator, v(2, 1, 0)),
    (Feature::TonstakersDeposit, v(2, 1, 0)),
    (Feature::VoteForProposal, v(2, 1, 0)),
    (Feature::ChangeDnsRecord, v(2, 1, 0)),
    (Feature::TokenBridgePaySwap, v(2, 1, 0)),
    (Feature::TonwhalesPoolDeposit, v(2, 7, 0)),
    (Feature::TonwhalesPoolWithdraw, v(2, 7, 0)),
    (Feature::VestingSendMsgComment, v(2, 7, 0)),
    (Feature::GetSettings, v(2, 1, 0)),
    (Feature::WalletSpecifiers, v(2, 1, 0)),
    (Feature::JettonIdV1, v(2, 2, 0)),
    (Feature::JettonIdV2, v(2, 6, 1)),
    (Feature::JettonIdV3, v(2, 8, 0)),
];

/// First firmware version supporting `feature`.
///
/// Features missing from the table map to [`DeviceVersion::UNRELEASED`].
pub fn required_version(feature: Feature) -> DeviceVersion {
    CAPABILITIES
        .iter()
        .find(|(f, _)| *f == feature)
        .map(|(_, version)| *version)
        .unwrap_or(DeviceVersion::UNRELEASED)
}

pub fn supports(device: DeviceVersion, feature: Feature) -> bool {
    device >= required_version(feature)
}

/// Feature gating the display of known jetton `id`, if any firmware can show it.
pub fn jetton_id_feature(id: u32) -> Option<Feature> {
    match id {
        0..=6 => Some(Feature::JettonIdV1),
        7..=9 => Some(Feature::JettonIdV2),
        10 => Some(Feature::JettonIdV3),
        _ => None,
    }
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Unsafe => "unsafe",
            Feature::Comment => "comment",
            Feature::JettonTransfer => "jetton-transfer",
            Feature::NftTransfer => "nft-transfer",
            Feature::JettonBurn => "jetton-burn",
            Feature::AddWhitelist => "add-whitelist",
            Feature::SingleNominatorWithdraw => "single-nominator-withdraw",
            Feature::SingleNominatorChangeValidator => "single-nominator-change-validator",
            Feature::TonstakersDeposit => "tonstakers-deposit",
            Feature::VoteForProposal => "vote-for-proposal",
            Feature::ChangeDnsRecord => "change-dns-record",
            Feature::TokenBridgePaySwap => "token-bridge-pay-swap",
            Feature::TonwhalesPoolDeposit => "tonwhales-pool-deposit",
            Feature::TonwhalesPoolWithdraw => "tonwhales-pool-withdraw",
            Feature::VestingSendMsgComment => "vesting-send-msg-comment",
            Feature::GetSettings => "get-settings",
            Feature::WalletSpecifiers => "wallet-specifiers",
            Feature::JettonIdV1 => "jetton-id-v1",
            Feature::JettonIdV2 => "jetton-id-v2",
            Feature::JettonIdV3 => "jetton-id-v3",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ver(s: &str) -> DeviceVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_every_feature_has_a_row() {
        let all = [
            Feature::Unsafe,
            Feature::Comment,
            Feature::JettonTransfer,
            Feature::NftTransfer,
            Feature::JettonBurn,
            Feature::AddWhitelist,
            Feature::SingleNominatorWithdraw,
            Feature::SingleNominatorChangeValidator,
            Feature::TonstakersDeposit,
            Feature::VoteForProposal,
            Feature::ChangeDnsRecord,
            Feature::TokenBridgePaySwap,
            Feature::TonwhalesPoolDeposit,
            Feature::TonwhalesPoolWithdraw,
            Feature::VestingSendMsgComment,
            Feature::GetSettings,
            Feature::WalletSpecifiers,
            Feature::JettonIdV1,
            Feature::JettonIdV2,
            Feature::JettonIdV3,
        ];
        for feature in all {
            assert_ne!(required_version(feature), DeviceVersion::UNRELEASED, "{feature}");
        }
        assert_eq!(CAPABILITIES.len(), all.len());
    }

    #[test]
    fn test_supports_is_inclusive() {
        assert!(supports(ver("2.1"), Feature::NftTransfer));
        assert!(!supports(ver("2.0.9"), Feature::NftTransfer));
        assert!(supports(ver("1.0"), Feature::Comment));
        assert!(supports(ver("2.7.0"), Feature::TonwhalesPoolDeposit));
        assert!(!supports(ver("2.6.9"), Feature::VestingSendMsgComment));
    }

    #[test]
    fn test_jetton_id_ranges() {
        assert_eq!(jetton_id_feature(0), Some(Feature::JettonIdV1));
        assert_eq!(jetton_id_feature(6), Some(Feature::JettonIdV1));
        assert_eq!(jetton_id_feature(9), Some(Feature::JettonIdV2));
        assert_eq!(jetton_id_feature(10), Some(Feature::JettonIdV3));
        assert_eq!(jetton_id_feature(11), None);
    }
}
