//! Hardware device signer.
//!
//! Every intent is translated before the first device request, so a batch
//! the device cannot sign fails before the user confirms anything. Signing
//! is then strictly sequential and all-or-nothing.

use std::sync::Arc;
use tracing::{debug, info};

use crate::blockchain::body::BodyWriter;
use crate::blockchain::transfer::{signing_hash, signing_payload, SignedTransfer};
use crate::blockchain::types::{Network, TonWallet, TransactionIntent, WalletVersion};
use crate::ledger::device::{CancelHandle, DerivationPath, LedgerDevice};
use crate::ledger::payload::DevicePayload;
use crate::ledger::translator::{wallet_specifiers, PayloadTranslator, TranslationContext, WalletSpecifiers};
use crate::signer::proof::{proof_hash, TonProof};
use crate::signer::software::{check_auth_type, transfer_params};
use crate::signer::types::{SignError, SignResult};

const SIGN_REQUEST_TAG: u8 = 0x00;

pub struct LedgerSigner {
    network: Network,
    wallet: TonWallet,
    index: u32,
    subwallet_id: Option<u32>,
    device: Arc<LedgerDevice>,
    translator: Arc<PayloadTranslator>,
    cancel: CancelHandle,
}

impl LedgerSigner {
    pub fn new(
        network: Network,
        wallet: TonWallet,
        index: u32,
        subwallet_id: Option<u32>,
        device: Arc<LedgerDevice>,
        translator: Arc<PayloadTranslator>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            network,
            wallet,
            index,
            subwallet_id,
            device,
            translator,
            cancel,
        }
    }

    fn path(&self) -> DerivationPath {
        DerivationPath::new(self.network, self.index)
    }

    /// # Panics
    /// If an intent has no messages.
    pub async fn sign_transactions(&self, intents: &[TransactionIntent]) -> SignResult<Vec<SignedTransfer>> {
        if self.wallet.version == WalletVersion::W5 {
            return Err(SignError::UnsupportedByBackend("W5 wallet signing"));
        }
        for intent in intents {
            assert!(!intent.messages.is_empty(), "transaction intent without messages");
            if intent.messages.len() > 1 {
                return Err(SignError::TooManyMessages(intent.messages.len()));
            }
            check_auth_type(&self.wallet, intent)?;
        }

        let session = self.device.session(self.cancel.clone()).await;
        let version = session.version().await?;
        let blind_signing = session.blind_signing_enabled(version).await?;
        let specifiers = wallet_specifiers(self.wallet.version, self.subwallet_id, version)?;

        let mut payloads = Vec::with_capacity(intents.len());
        for intent in intents {
            let message = &intent.messages[0];
            let ctx = TranslationContext {
                network: self.network,
                destination: &message.destination,
                version,
                model: session.model(),
                blind_signing,
                token_hint: intent.hints.token_address.as_ref(),
            };
            payloads.push(self.translator.translate(message.body.as_deref(), &ctx).await?);
        }
        debug!(count = intents.len(), firmware = %version, "Translated all intents");

        let path = self.path();
        let mut signed = Vec::with_capacity(intents.len());
        for (intent, payload) in intents.iter().zip(&payloads) {
            let params = transfer_params(&self.wallet, self.network, self.subwallet_id, intent);
            let request = sign_request(intent, params.valid_until, payload.as_ref(), specifiers);
            let device_signature = session.sign_transaction(&path, &request).await?;

            let local = signing_payload(intent, &params);
            if device_signature.hash != signing_hash(&local) {
                return Err(SignError::DeviceResponse("hash mismatch".into()));
            }
            signed.push(SignedTransfer::assemble(
                self.wallet.version,
                local,
                &device_signature.signature,
                intent.seqno,
                params.valid_until,
            ));
        }

        info!(count = signed.len(), "Signed transfers on device");
        Ok(signed)
    }

    pub async fn sign_proof(&self, proof: &TonProof) -> SignResult<[u8; 64]> {
        proof.check_device_limits()?;
        let session = self.device.session(self.cancel.clone()).await;
        let device_signature = session
            .sign_proof(&self.path(), &proof.domain, proof.timestamp, proof.payload.as_bytes())
            .await?;
        if device_signature.hash != proof_hash(&self.wallet.address, proof) {
            return Err(SignError::DeviceResponse("proof hash mismatch".into()));
        }
        Ok(device_signature.signature)
    }
}

impl std::fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("network", &self.network)
            .field("index", &self.index)
            .field("subwallet_id", &self.subwallet_id)
            .finish_non_exhaustive()
    }
}

/// Device sign request for a single-message intent.
fn sign_request(
    intent: &TransactionIntent,
    valid_until: u32,
    payload: Option<&DevicePayload>,
    specifiers: Option<WalletSpecifiers>,
) -> Vec<u8> {
    let message = &intent.messages[0];
    let mut writer = BodyWriter::default();
    writer
        .put_u8(SIGN_REQUEST_TAG)
        .put_u8(intent.send_mode)
        .put_u32(intent.seqno)
        .put_u32(valid_until)
        .put_u128(message.value)
        .put_address(&message.destination)
        .put_u8(message.bounceable as u8)
        .put_optional(message.state_init.as_deref());

    match payload {
        Some(payload) => {
            writer.put_u8(1);
            payload.write_to(&mut writer);
        }
        None => {
            writer.put_u8(0);
        }
    }

    match specifiers {
        Some(specifiers) => {
            writer
                .put_u8(1)
                .put_u8(specifiers.include_wallet_op as u8)
                .put_optional(specifiers.subwallet_id.map(u32::to_be_bytes).as_ref().map(|id| &id[..]));
        }
        None => {
            writer.put_u8(0);
        }
    }
    writer.finish()
}
