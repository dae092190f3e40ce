//! Chain RPC and indexer collaborators with endpoint failover.
//!
//! # Responsibilities
//! - Define the async surface this core needs from TON/TRON RPC and the indexer
//! - Fail over between endpoints with a per-call timeout
//! - Classify errors so callers only retry transient failures

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::blockchain::address::{Address, TronAddress};
use crate::blockchain::transfer::SignedTransfer;
use crate::blockchain::types::Network;
use crate::resilience::retries::Retryable;

/// Errors returned by RPC collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Connection dropped or the endpoint answered with a server error.
    #[error("RPC network error: {0}")]
    Network(String),

    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The request itself was refused; repeating it will not help.
    #[error("RPC rejected request: {0}")]
    Rejected(String),

    #[error("All RPC endpoints failed for {0}")]
    AllEndpointsFailed(&'static str),
}

impl Retryable for RpcError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcError::Network(_) | RpcError::Timeout(_) | RpcError::AllEndpointsFailed(_)
        )
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// A resolved `.ton` / `.t.me` domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDomain {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_memo_required: bool,
    #[serde(default)]
    pub is_scam: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletInfo {
    pub seqno: u32,
    pub balance: u128,
    pub is_initialized: bool,
}

/// The owner's wallet for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWalletInfo {
    pub address: Address,
    pub balance: u128,
    pub is_deployed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulationResult {
    /// Network fee in nanotons before the safety factor is applied.
    pub network_fee: u128,
}

/// Gasless availability reported by the diesel estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DieselStatus {
    NotAvailable,
    NotAuthorized,
    PendingPrevious,
    Available,
    StarsFee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DieselRequest {
    pub address: Address,
    pub token_address: Address,
    /// Nanotons the relayer has to cover.
    pub toncoin_amount: u128,
    pub is_w5: bool,
    pub is_stars: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DieselEstimate {
    pub status: DieselStatus,
    /// In token units, or in stars for [`DieselStatus::StarsFee`].
    pub amount: Option<u128>,
    /// Unix seconds when a still pending gasless transfer was created.
    pub pending_created_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TronTransferEstimate {
    pub trx_balance: u128,
    /// Balance of the transferred token, if any.
    pub token_balance: Option<u128>,
    pub free_bandwidth: u64,
    /// Sun per bandwidth point.
    pub bandwidth_unit_fee: u64,
    /// Energy cost in sun of the contract call; zero for TRX transfers.
    pub energy_fee: u128,
    /// Size of the unsigned raw transaction.
    pub raw_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TronTransferRequest {
    pub from: TronAddress,
    pub to: TronAddress,
    pub token_address: Option<TronAddress>,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub tx_id: String,
}

/// Chain RPC surface used by drafting and submission.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// `Ok(None)` when the domain has no wallet record.
    async fn resolve_domain(&self, network: Network, domain: &str) -> RpcResult<Option<ResolvedDomain>>;

    async fn is_initialized(&self, network: Network, address: &Address) -> RpcResult<bool>;

    async fn has_transactions(&self, network: Network, address: &Address) -> RpcResult<bool>;

    async fn wallet_info(&self, network: Network, address: &Address) -> RpcResult<WalletInfo>;

    async fn token_wallet(
        &self,
        network: Network,
        owner: &Address,
        token: &Address,
    ) -> RpcResult<TokenWalletInfo>;

    async fn emulate(&self, network: Network, transfer: &SignedTransfer) -> RpcResult<EmulationResult>;

    async fn estimate_diesel(&self, request: &DieselRequest) -> RpcResult<DieselEstimate>;

    async fn estimate_tron_transfer(
        &self,
        network: Network,
        request: &TronTransferRequest,
    ) -> RpcResult<TronTransferEstimate>;

    async fn submit_transfer(&self, network: Network, transfer: &SignedTransfer) -> RpcResult<SubmitReceipt>;
}

/// One page of raw activity from the indexer.
#[derive(Debug, Clone, Default)]
pub struct ActivityPage {
    /// Undecoded items; malformed ones are dropped by the merge engine.
    pub items: Vec<serde_json::Value>,
}

/// Query for one asset feed of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub account_id: String,
    /// `None` for the native asset feed.
    pub token_slug: Option<String>,
    /// Only items strictly newer than this timestamp (ms).
    pub from_timestamp: Option<u64>,
    /// Only items strictly older than this timestamp (ms).
    pub to_timestamp: Option<u64>,
    pub limit: usize,
}

#[async_trait]
pub trait ActivityIndexer: Send + Sync {
    async fn fetch_activity_slice(&self, query: &ActivityQuery) -> RpcResult<ActivityPage>;
}

/// RPC client that tries each endpoint in turn.
///
/// Non-retryable errors are returned immediately; transient failures and
/// timeouts move on to the next endpoint.
#[derive(Clone)]
pub struct FailoverRpc {
    endpoints: Vec<Arc<dyn ChainRpc>>,
    timeout_duration: Duration,
}

impl FailoverRpc {
    pub fn new(endpoints: Vec<Arc<dyn ChainRpc>>, timeout_duration: Duration) -> Self {
        tracing::info!(
            endpoints = endpoints.len(),
            timeout_ms = timeout_duration.as_millis() as u64,
            "RPC failover client initialized"
        );
        Self {
            endpoints,
            timeout_duration,
        }
    }

    async fn failover<'a, T>(
        &'a self,
        op: &'static str,
        call: impl Fn(&'a dyn ChainRpc) -> BoxFuture<'a, RpcResult<T>>,
    ) -> RpcResult<T> {
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            match timeout(self.timeout_duration, call(endpoint.as_ref())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, op, error = %e, "RPC error, trying next endpoint");
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, op, "RPC timeout, trying next endpoint");
                }
            }
        }
        Err(RpcError::AllEndpointsFailed(op))
    }
}

#[async_trait]
impl ChainRpc for FailoverRpc {
    async fn resolve_domain(&self, network: Network, domain: &str) -> RpcResult<Option<ResolvedDomain>> {
        self.failover("resolve_domain", |rpc| rpc.resolve_domain(network, domain))
            .await
    }

    async fn is_initialized(&self, network: Network, address: &Address) -> RpcResult<bool> {
        self.failover("is_initialized", |rpc| rpc.is_initialized(network, address))
            .await
    }

    async fn has_transactions(&self, network: Network, address: &Address) -> RpcResult<bool> {
        self.failover("has_transactions", |rpc| rpc.has_transactions(network, address))
            .await
    }

    async fn wallet_info(&self, network: Network, address: &Address) -> RpcResult<WalletInfo> {
        self.failover("wallet_info", |rpc| rpc.wallet_info(network, address))
            .await
    }

    async fn token_wallet(
        &self,
        network: Network,
        owner: &Address,
        token: &Address,
    ) -> RpcResult<TokenWalletInfo> {
        self.failover("token_wallet", |rpc| rpc.token_wallet(network, owner, token))
            .await
    }

    async fn emulate(&self, network: Network, transfer: &SignedTransfer) -> RpcResult<EmulationResult> {
        self.failover("emulate", |rpc| rpc.emulate(network, transfer))
            .await
    }

    async fn estimate_diesel(&self, request: &DieselRequest) -> RpcResult<DieselEstimate> {
        self.failover("estimate_diesel", |rpc| rpc.estimate_diesel(request))
            .await
    }

    async fn estimate_tron_transfer(
        &self,
        network: Network,
        request: &TronTransferRequest,
    ) -> RpcResult<TronTransferEstimate> {
        self.failover("estimate_tron_transfer", |rpc| {
            rpc.estimate_tron_transfer(network, request)
        })
        .await
    }

    async fn submit_transfer(&self, network: Network, transfer: &SignedTransfer) -> RpcResult<SubmitReceipt> {
        self.failover("submit_transfer", |rpc| rpc.submit_transfer(network, transfer))
            .await
    }
}

impl std::fmt::Debug for FailoverRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverRpc")
            .field("endpoints", &self.endpoints.len())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
