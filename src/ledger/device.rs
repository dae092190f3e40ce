//! Device session management.
//!
//! A [`LedgerDevice`] serialises access to one physical device. Every
//! user-facing operation opens a [`DeviceSession`], which holds the device
//! lock until it is dropped, so no other operation can interleave frames.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::blockchain::types::Network;
use crate::ledger::capabilities::{supports, Feature};
use crate::ledger::channel::{ins, split_response, Apdu, DeviceChannel, DeviceError, DeviceModel};
use crate::ledger::version::DeviceVersion;
use crate::resilience::retries::{retry_with_backoff, RetryPolicy};

const HARDENED: u32 = 0x8000_0000;
const TON_COIN_TYPE: u32 = 607;

const SETTINGS_BLIND_SIGNING: u8 = 0x01;

/// Cooperative cancellation for device operations.
///
/// Checked before each frame is sent. Once the device is waiting for the
/// user to confirm, cancelling has no effect until the device answers.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// BIP-32 path of a TON account on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationPath {
    pub network: Network,
    pub index: u32,
}

impl DerivationPath {
    pub fn new(network: Network, index: u32) -> Self {
        Self { network, index }
    }

    pub fn components(&self) -> [u32; 6] {
        let network = match self.network {
            Network::Mainnet => 0,
            Network::Testnet => 1,
        };
        [
            44 | HARDENED,
            TON_COIN_TYPE | HARDENED,
            network | HARDENED,
            HARDENED,
            self.index | HARDENED,
            HARDENED,
        ]
    }

    /// Component count followed by each component, big-endian.
    pub fn encode(&self) -> Vec<u8> {
        let components = self.components();
        let mut out = Vec::with_capacity(1 + components.len() * 4);
        out.push(components.len() as u8);
        for component in components {
            out.extend_from_slice(&component.to_be_bytes());
        }
        out
    }
}

/// Signature and the hash the device signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignature {
    pub signature: [u8; 64],
    pub hash: [u8; 32],
}

impl DeviceSignature {
    fn parse(data: &[u8]) -> Result<Self, DeviceError> {
        if data.len() != 96 {
            return Err(DeviceError::Malformed(format!(
                "expected 96 signature bytes, got {}",
                data.len()
            )));
        }
        let mut signature = [0u8; 64];
        let mut hash = [0u8; 32];
        signature.copy_from_slice(&data[..64]);
        hash.copy_from_slice(&data[64..]);
        Ok(Self { signature, hash })
    }
}

pub struct LedgerDevice {
    channel: Arc<dyn DeviceChannel>,
    lock: Mutex<()>,
    /// Blind-signing setting keyed by firmware version.
    blind_signing: DashMap<DeviceVersion, bool>,
    retry: RetryPolicy,
}

impl LedgerDevice {
    pub fn new(channel: Arc<dyn DeviceChannel>, retry: RetryPolicy) -> Self {
        Self {
            channel,
            lock: Mutex::new(()),
            blind_signing: DashMap::new(),
            retry,
        }
    }

    pub fn model(&self) -> DeviceModel {
        self.channel.device_model()
    }

    /// Wait for exclusive access to the device.
    pub async fn session(&self, cancel: CancelHandle) -> DeviceSession<'_> {
        let guard = self.lock.lock().await;
        DeviceSession {
            device: self,
            _guard: guard,
            cancel,
        }
    }
}

impl std::fmt::Debug for LedgerDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDevice")
            .field("model", &self.model())
            .field("retry", &self.retry)
            .finish()
    }
}

pub struct DeviceSession<'a> {
    device: &'a LedgerDevice,
    _guard: MutexGuard<'a, ()>,
    cancel: CancelHandle,
}

impl<'a> DeviceSession<'a> {
    pub fn model(&self) -> DeviceModel {
        self.device.model()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send_frames(&self, ins: u8, p1: u8, data: &[u8]) -> Result<Vec<u8>, DeviceError> {
        let mut response = Vec::new();
        for frame in Apdu::chunked(ins, p1, data) {
            if self.cancel.is_cancelled() {
                return Err(DeviceError::Cancelled);
            }
            let raw = self.device.channel.exchange(&frame).await?;
            response = split_response(raw)?;
        }
        Ok(response)
    }

    /// Send a whole command, restarting it from the first frame on transient failure.
    async fn command(&self, op: &'static str, ins: u8, p1: u8, data: &[u8]) -> Result<Vec<u8>, DeviceError> {
        debug!(op, ins, len = data.len(), "Sending device command");
        retry_with_backoff(self.device.retry, op, move || self.send_frames(ins, p1, data)).await
    }

    pub async fn version(&self) -> Result<DeviceVersion, DeviceError> {
        let data = self.command("ledger_get_version", ins::GET_VERSION, 0, &[]).await?;
        match data.as_slice() {
            [major, minor, patch, ..] => Ok(DeviceVersion::new(*major as u32, *minor as u32, *patch as u32)),
            _ => Err(DeviceError::Malformed(format!("version of {} bytes", data.len()))),
        }
    }

    /// Whether the user enabled blind signing.
    ///
    /// Firmware without the settings command is assumed to allow it; such a
    /// device rejects unsafe payloads itself if it does not.
    pub async fn blind_signing_enabled(&self, version: DeviceVersion) -> Result<bool, DeviceError> {
        if !supports(version, Feature::GetSettings) {
            return Ok(true);
        }
        if let Some(enabled) = self.device.blind_signing.get(&version) {
            return Ok(*enabled);
        }

        let data = self.command("ledger_get_settings", ins::GET_SETTINGS, 0, &[]).await?;
        let flags = data
            .first()
            .copied()
            .ok_or_else(|| DeviceError::Malformed("empty settings".into()))?;
        let enabled = flags & SETTINGS_BLIND_SIGNING != 0;
        info!(version = %version, blind_signing = enabled, "Read device settings");
        self.device.blind_signing.insert(version, enabled);
        Ok(enabled)
    }

    pub async fn sign_transaction(
        &self,
        path: &DerivationPath,
        request: &[u8],
    ) -> Result<DeviceSignature, DeviceError> {
        let mut data = path.encode();
        data.extend_from_slice(request);
        let response = self.command("ledger_sign_tx", ins::SIGN_TX, 0, &data).await?;
        DeviceSignature::parse(&response)
    }

    pub async fn sign_proof(
        &self,
        path: &DerivationPath,
        domain: &str,
        timestamp: u64,
        payload: &[u8],
    ) -> Result<DeviceSignature, DeviceError> {
        let mut data = path.encode();
        data.push(domain.len() as u8);
        data.extend_from_slice(domain.as_bytes());
        data.extend_from_slice(&timestamp.to_be_bytes());
        data.extend_from_slice(payload);
        let response = self.command("ledger_get_proof", ins::GET_PROOF, 0x01, &data).await?;
        DeviceSignature::parse(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::channel::ChannelError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct ScriptedChannel {
        responses: StdMutex<VecDeque<Result<Vec<u8>, ChannelError>>>,
        sent: StdMutex<Vec<Apdu>>,
    }

    impl ScriptedChannel {
        fn new(responses: Vec<Result<Vec<u8>, ChannelError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                sent: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DeviceChannel for ScriptedChannel {
        async fn exchange(&self, apdu: &Apdu) -> Result<Vec<u8>, ChannelError> {
            self.sent.lock().unwrap().push(apdu.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(vec![0x90, 0x00]))
        }

        fn device_model(&self) -> DeviceModel {
            DeviceModel::NanoX
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn test_path_encoding() {
        let encoded = DerivationPath::new(Network::Testnet, 2).encode();
        assert_eq!(encoded.len(), 25);
        assert_eq!(encoded[0], 6);
        assert_eq!(&encoded[1..5], &(44 | HARDENED).to_be_bytes());
        assert_eq!(&encoded[9..13], &(1 | HARDENED).to_be_bytes());
        assert_eq!(&encoded[17..21], &(2 | HARDENED).to_be_bytes());
    }

    #[tokio::test]
    async fn test_version_retries_transport_failure() {
        let channel = ScriptedChannel::new(vec![
            Err(ChannelError::Disconnected("usb".into())),
            Ok(vec![2, 7, 1, 0x90, 0x00]),
        ]);
        let device = LedgerDevice::new(channel.clone(), policy());
        let session = device.session(CancelHandle::new()).await;
        assert_eq!(session.version().await.unwrap(), DeviceVersion::new(2, 7, 1));
        assert_eq!(channel.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let channel = ScriptedChannel::new(vec![Ok(vec![0x69, 0x85])]);
        let device = LedgerDevice::new(channel.clone(), policy());
        let session = device.session(CancelHandle::new()).await;
        let err = session
            .sign_transaction(&DerivationPath::new(Network::Mainnet, 0), &[1, 2, 3])
            .await
            .unwrap_err();
        assert_eq!(err, DeviceError::RejectedByUser);
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settings_cached_per_version() {
        let channel = ScriptedChannel::new(vec![Ok(vec![0x00, 0x90, 0x00])]);
        let device = LedgerDevice::new(channel.clone(), policy());
        let version = DeviceVersion::new(2, 2, 0);
        {
            let session = device.session(CancelHandle::new()).await;
            assert!(!session.blind_signing_enabled(version).await.unwrap());
        }
        let session = device.session(CancelHandle::new()).await;
        assert!(!session.blind_signing_enabled(version).await.unwrap());
        assert!(session.blind_signing_enabled(DeviceVersion::new(2, 0, 0)).await.unwrap());
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_sending() {
        let channel = ScriptedChannel::new(vec![]);
        let device = LedgerDevice::new(channel.clone(), policy());
        let cancel = CancelHandle::new();
        cancel.cancel();
        let session = device.session(cancel).await;
        assert_eq!(session.version().await.unwrap_err(), DeviceError::Cancelled);
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_requests_are_chunked() {
        let mut signed = vec![1u8; 64];
        signed.extend_from_slice(&[2u8; 32]);
        signed.extend_from_slice(&[0x90, 0x00]);
        let channel = ScriptedChannel::new(vec![Ok(vec![0x90, 0x00]), Ok(signed)]);
        let device = LedgerDevice::new(channel.clone(), policy());
        let session = device.session(CancelHandle::new()).await;
        let result = session
            .sign_transaction(&DerivationPath::new(Network::Mainnet, 0), &[0u8; 300])
            .await
            .unwrap();
        assert_eq!(result.hash, [2u8; 32]);
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].data.len(), 255);
    }
}
