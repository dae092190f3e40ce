//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

use wallet_core::blockchain::address::Address;
use wallet_core::blockchain::client::{
    ActivityIndexer, ActivityPage, ActivityQuery, ChainRpc, DieselEstimate, DieselRequest, EmulationResult,
    ResolvedDomain, RpcError, RpcResult, SubmitReceipt, TokenWalletInfo, TronTransferEstimate, TronTransferRequest,
    WalletInfo,
};
use wallet_core::blockchain::transfer::{signing_hash, signing_payload, wallet_id, SignedTransfer, TransferParams};
use wallet_core::blockchain::types::{
    Account, AccountKind, Message, Network, TonWallet, TransactionIntent, WalletVersion,
};
use wallet_core::ledger::channel::{ins, Apdu, ChannelError, DeviceChannel, DeviceModel, P2_MORE};
use wallet_core::ledger::{JettonRegistry, OpcodeParser, PayloadTranslator, TokenResolver};
use wallet_core::resilience::RetryPolicy;
use wallet_core::signer::{MnemonicVault, VaultError};

pub const VALID_UNTIL: u32 = 1_900_000_000;

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 2,
    }
}

pub fn address(byte: u8) -> Address {
    Address::new(0, [byte; 32])
}

pub fn wallet(version: WalletVersion) -> TonWallet {
    TonWallet {
        address: address(0xaa),
        public_key: Some(hex::encode([7u8; 32])),
        version,
        is_initialized: true,
    }
}

pub fn account(kind: AccountKind, version: WalletVersion) -> Account {
    Account {
        id: "account-1".into(),
        network: Network::Mainnet,
        kind,
        ton: wallet(version),
    }
}

pub fn intent(destination: Address, value: u128, body: Option<Vec<u8>>, seqno: u32) -> TransactionIntent {
    let mut intent = TransactionIntent::single(
        Message {
            destination,
            value,
            bounceable: true,
            state_init: None,
            body,
        },
        seqno,
    );
    intent.valid_until = Some(VALID_UNTIL);
    intent
}

/// Hash the device must report for `intent` signed from `wallet`.
pub fn expected_hash(wallet: &TonWallet, network: Network, intent: &TransactionIntent) -> [u8; 32] {
    let params = TransferParams {
        version: wallet.version,
        wallet_id: wallet_id(wallet.version, network, wallet.address.workchain(), None),
        valid_until: intent.expires_at(),
    };
    signing_hash(&signing_payload(intent, &params))
}

/// Outcome of one scripted sign command.
#[derive(Debug, Clone)]
pub enum SignStep {
    Sign([u8; 32]),
    Status(u16),
    Disconnect,
}

/// Device that answers version and settings queries and replays sign steps.
pub struct FakeDevice {
    pub version: [u8; 3],
    pub settings: u8,
    pub model: DeviceModel,
    steps: Mutex<VecDeque<SignStep>>,
    pub sent: Mutex<Vec<Apdu>>,
}

impl FakeDevice {
    pub fn new(version: [u8; 3], blind_signing: bool, steps: Vec<SignStep>) -> Arc<Self> {
        Arc::new(Self {
            version,
            settings: blind_signing as u8,
            model: DeviceModel::NanoX,
            steps: Mutex::new(steps.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sign_commands(&self) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|apdu| apdu.ins == ins::SIGN_TX && apdu.p2 != P2_MORE)
            .count()
    }

    pub fn total_frames(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

fn ok(mut data: Vec<u8>) -> Vec<u8> {
    data.extend_from_slice(&[0x90, 0x00]);
    data
}

#[async_trait]
impl DeviceChannel for FakeDevice {
    async fn exchange(&self, apdu: &Apdu) -> Result<Vec<u8>, ChannelError> {
        // Let other tasks run between frames, as a real transport would.
        tokio::task::yield_now().await;
        self.sent.lock().unwrap().push(apdu.clone());
        match apdu.ins {
            ins::GET_VERSION => Ok(ok(self.version.to_vec())),
            ins::GET_SETTINGS => Ok(ok(vec![self.settings])),
            _ if apdu.p2 == P2_MORE => Ok(ok(Vec::new())),
            ins::SIGN_TX | ins::GET_PROOF => {
                let step = self.steps.lock().unwrap().pop_front();
                match step {
                    Some(SignStep::Sign(hash)) => {
                        let mut data = vec![0x5a; 64];
                        data.extend_from_slice(&hash);
                        Ok(ok(data))
                    }
                    Some(SignStep::Status(status)) => Ok(status.to_be_bytes().to_vec()),
                    Some(SignStep::Disconnect) => Err(ChannelError::Disconnected("cable".into())),
                    None => Ok(vec![0x6f, 0x00]),
                }
            }
            _ => Ok(vec![0x6d, 0x00]),
        }
    }

    fn device_model(&self) -> DeviceModel {
        self.model
    }
}

/// Resolver with a fixed token wallet to master table.
#[derive(Default)]
pub struct FakeResolver {
    pub masters: HashMap<Address, Address>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenResolver for FakeResolver {
    async fn resolve_token_address(&self, _: Network, token_wallet: &Address) -> RpcResult<Option<Address>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.masters.get(token_wallet).cloned())
    }
}

pub fn translator(resolver: FakeResolver) -> Arc<PayloadTranslator> {
    Arc::new(PayloadTranslator::new(
        Arc::new(OpcodeParser),
        Arc::new(JettonRegistry::new(Arc::new(resolver))),
    ))
}

/// Vault holding one mnemonic behind one password.
pub struct FakeVault {
    pub password: String,
    pub words: Vec<String>,
}

impl FakeVault {
    pub fn abandon() -> Self {
        let mut words = vec!["abandon".to_string(); 23];
        words.push("art".into());
        Self {
            password: "hunter2".into(),
            words,
        }
    }
}

#[async_trait]
impl MnemonicVault for FakeVault {
    async fn fetch_mnemonic(
        &self,
        _account_id: &str,
        password: &str,
    ) -> Result<Option<Zeroizing<Vec<String>>>, VaultError> {
        if password != self.password {
            return Ok(None);
        }
        Ok(Some(Zeroizing::new(self.words.clone())))
    }
}

/// Chain RPC with canned answers.
pub struct FakeRpc {
    pub domains: HashMap<String, ResolvedDomain>,
    pub destination_initialized: bool,
    pub destination_has_transactions: bool,
    pub wallet: WalletInfo,
    pub token_wallet: TokenWalletInfo,
    pub network_fee: u128,
    pub emulate_error: Option<RpcError>,
    pub diesel: DieselEstimate,
    pub tron: TronTransferEstimate,
    /// `wallet_info` fails transiently this many times first.
    pub wallet_failures: AtomicUsize,
    pub wallet_calls: AtomicUsize,
    pub emulations: AtomicUsize,
    pub diesel_requests: Mutex<Vec<DieselRequest>>,
    pub submitted: Mutex<Vec<SignedTransfer>>,
}

impl Default for FakeRpc {
    fn default() -> Self {
        Self {
            domains: HashMap::new(),
            destination_initialized: true,
            destination_has_transactions: true,
            wallet: WalletInfo {
                seqno: 4,
                balance: 10_000_000_000,
                is_initialized: true,
            },
            token_wallet: TokenWalletInfo {
                address: address(0x77),
                balance: 0,
                is_deployed: true,
            },
            network_fee: 2_000_000,
            emulate_error: None,
            diesel: DieselEstimate {
                status: wallet_core::blockchain::client::DieselStatus::NotAvailable,
                amount: None,
                pending_created_at: None,
            },
            tron: TronTransferEstimate {
                trx_balance: 0,
                token_balance: None,
                free_bandwidth: 0,
                bandwidth_unit_fee: 1000,
                energy_fee: 0,
                raw_size: 100,
            },
            wallet_failures: AtomicUsize::new(0),
            wallet_calls: AtomicUsize::new(0),
            emulations: AtomicUsize::new(0),
            diesel_requests: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn resolve_domain(&self, _: Network, domain: &str) -> RpcResult<Option<ResolvedDomain>> {
        Ok(self.domains.get(domain).cloned())
    }

    async fn is_initialized(&self, _: Network, _: &Address) -> RpcResult<bool> {
        Ok(self.destination_initialized)
    }

    async fn has_transactions(&self, _: Network, _: &Address) -> RpcResult<bool> {
        Ok(self.destination_has_transactions)
    }

    async fn wallet_info(&self, _: Network, _: &Address) -> RpcResult<WalletInfo> {
        self.wallet_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.wallet_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.wallet_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RpcError::Network("connection reset".into()));
        }
        Ok(self.wallet)
    }

    async fn token_wallet(&self, _: Network, _: &Address, _: &Address) -> RpcResult<TokenWalletInfo> {
        Ok(self.token_wallet.clone())
    }

    async fn emulate(&self, _: Network, _: &SignedTransfer) -> RpcResult<EmulationResult> {
        self.emulations.fetch_add(1, Ordering::SeqCst);
        match &self.emulate_error {
            Some(e) => Err(e.clone()),
            None => Ok(EmulationResult {
                network_fee: self.network_fee,
            }),
        }
    }

    async fn estimate_diesel(&self, request: &DieselRequest) -> RpcResult<DieselEstimate> {
        self.diesel_requests.lock().unwrap().push(request.clone());
        Ok(self.diesel.clone())
    }

    async fn estimate_tron_transfer(&self, _: Network, _: &TronTransferRequest) -> RpcResult<TronTransferEstimate> {
        Ok(self.tron.clone())
    }

    async fn submit_transfer(&self, _: Network, transfer: &SignedTransfer) -> RpcResult<SubmitReceipt> {
        self.submitted.lock().unwrap().push(transfer.clone());
        Ok(SubmitReceipt {
            tx_id: transfer.message_hash(),
        })
    }
}

/// Indexer serving fixed pages per feed; `None` slug is the native feed.
#[derive(Default)]
pub struct FakeIndexer {
    pub pages: Mutex<HashMap<Option<String>, VecDeque<RpcResult<ActivityPage>>>>,
    pub queries: Mutex<Vec<ActivityQuery>>,
}

impl FakeIndexer {
    pub fn push(&self, slug: Option<&str>, page: RpcResult<ActivityPage>) {
        self.pages
            .lock()
            .unwrap()
            .entry(slug.map(str::to_owned))
            .or_default()
            .push_back(page);
    }
}

#[async_trait]
impl ActivityIndexer for FakeIndexer {
    async fn fetch_activity_slice(&self, query: &ActivityQuery) -> RpcResult<ActivityPage> {
        self.queries.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .get_mut(&query.token_slug)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ActivityPage::default()))
    }
}
