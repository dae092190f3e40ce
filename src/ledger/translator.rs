//! Firmware-aware payload translation.
//!
//! # Data Flow
//! ```text
//! message body
//!     → PayloadParser (structured variant, or unsafe on failure)
//!     → capability check (downgrade to unsafe, or fail closed)
//!     → blind-signing check
//!     → known jetton lookup (JettonRegistry)
//!     → DevicePayload
//! ```

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::blockchain::address::Address;
use crate::blockchain::types::{Network, WalletVersion};
use crate::ledger::capabilities::{jetton_id_feature, required_version, supports, Feature};
use crate::ledger::channel::DeviceModel;
use crate::ledger::jettons::{known_jetton_id, JettonRegistry};
use crate::ledger::parser::PayloadParser;
use crate::ledger::payload::{DevicePayload, JettonIdentification};
use crate::ledger::version::DeviceVersion;
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Device firmware {actual} does not support {feature} (requires {required})")]
    UnsupportedByDevice {
        feature: Feature,
        required: DeviceVersion,
        actual: DeviceVersion,
    },

    #[error("Payload can only be blind-signed and blind signing is disabled")]
    BlindSigningRequired,
}

fn unsupported(feature: Feature, actual: DeviceVersion) -> TranslateError {
    TranslateError::UnsupportedByDevice {
        feature,
        required: required_version(feature),
        actual,
    }
}

/// Facts about the device and the message a payload is translated for.
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext<'a> {
    pub network: Network,
    /// Message destination; for jetton transfers, the sender's token wallet.
    pub destination: &'a Address,
    pub version: DeviceVersion,
    pub model: DeviceModel,
    pub blind_signing: bool,
    /// Jetton master supplied by the caller, skipping the lookup.
    pub token_hint: Option<&'a Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSpecifiers {
    pub include_wallet_op: bool,
    pub subwallet_id: Option<u32>,
}

/// Wallet specifiers the device needs for non-default wallets.
///
/// `v3R2` and explicit subwallet ids need firmware that understands
/// specifiers; anything else signs with the device defaults.
pub fn wallet_specifiers(
    wallet: WalletVersion,
    subwallet_id: Option<u32>,
    device: DeviceVersion,
) -> Result<Option<WalletSpecifiers>, TranslateError> {
    if wallet != WalletVersion::V3R2 && subwallet_id.is_none() {
        return Ok(None);
    }
    if !supports(device, Feature::WalletSpecifiers) {
        return Err(unsupported(Feature::WalletSpecifiers, device));
    }
    Ok(Some(WalletSpecifiers {
        include_wallet_op: false,
        subwallet_id,
    }))
}

pub struct PayloadTranslator {
    parser: Arc<dyn PayloadParser>,
    jettons: Arc<JettonRegistry>,
}

impl PayloadTranslator {
    pub fn new(parser: Arc<dyn PayloadParser>, jettons: Arc<JettonRegistry>) -> Self {
        Self { parser, jettons }
    }

    /// Translate one message body. A message without a body has no payload.
    pub async fn translate(
        &self,
        body: Option<&[u8]>,
        ctx: &TranslationContext<'_>,
    ) -> Result<Option<DevicePayload>, TranslateError> {
        let Some(body) = body else {
            return Ok(None);
        };

        let parsed = match self.parser.parse(body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Body not recognised, sending as unsafe");
                DevicePayload::Unsafe { body: body.to_vec() }
            }
        };

        let mut payload = self.gate(parsed, body, ctx.version)?;

        if payload.is_unsafe() && !ctx.blind_signing {
            return Err(TranslateError::BlindSigningRequired);
        }

        if let DevicePayload::JettonTransfer { known_jetton, .. } = &mut payload {
            if ctx.model.supports_jetton_id() && supports(ctx.version, Feature::JettonIdV1) {
                *known_jetton = self.identify_jetton(ctx).await;
            }
        }

        Ok(Some(payload))
    }

    /// Downgrade payloads the firmware cannot display.
    fn gate(
        &self,
        parsed: DevicePayload,
        body: &[u8],
        version: DeviceVersion,
    ) -> Result<DevicePayload, TranslateError> {
        let feature = parsed.feature();
        if supports(version, feature) {
            return Ok(parsed);
        }
        if !supports(version, Feature::Unsafe) {
            return Err(unsupported(feature, version));
        }

        warn!(
            feature = %feature,
            required = %required_version(feature),
            firmware = %version,
            "Firmware cannot display payload, downgrading to unsafe"
        );
        metrics::record_payload_downgrade(feature.as_str());
        Ok(DevicePayload::Unsafe { body: body.to_vec() })
    }

    async fn identify_jetton(&self, ctx: &TranslationContext<'_>) -> JettonIdentification {
        let master = match ctx.token_hint {
            Some(master) => Some(master.clone()),
            None => self.jettons.master_of(ctx.network, ctx.destination).await,
        };
        let Some(master) = master else {
            return JettonIdentification::NotFound;
        };

        match known_jetton_id(&master) {
            Some(jetton_id)
                if jetton_id_feature(jetton_id).is_some_and(|feature| supports(ctx.version, feature)) =>
            {
                JettonIdentification::Known {
                    jetton_id,
                    workchain: master.workchain(),
                }
            }
            _ => JettonIdentification::NotFound,
        }
    }
}

impl std::fmt::Debug for PayloadTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadTranslator")
            .field("jettons", &self.jettons)
            .finish()
    }
}
