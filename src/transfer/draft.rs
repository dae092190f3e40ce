//! Fee estimation and validation for outgoing transfers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::blockchain::address::{Address, TronAddress};
use crate::blockchain::body::JettonTransferBody;
use crate::blockchain::client::{ChainRpc, RpcError, RpcResult, TronTransferRequest};
use crate::blockchain::types::{
    Account, IntentHints, Message, Network, TransactionIntent, SEND_MODE_CARRY_ALL_BALANCE,
    SEND_MODE_DEFAULT,
};
use crate::config::schema::DraftingConfig;
use crate::resilience::retries::{retry_with_backoff, Retryable, RetryPolicy};
use crate::signer::MockSigner;
use crate::transfer::address::check_to_address;
use crate::transfer::cache::DraftCache;
use crate::transfer::diesel::{estimate_diesel, DieselContext};
use crate::transfer::types::{
    DieselDraft, DraftError, DraftResult, TokenRef, TonDraftRequest, TronDraftRequest,
    TOKEN_TRANSFER_AMOUNT, TOKEN_TRANSFER_FORWARD_AMOUNT, TOKEN_TRANSFER_REAL_AMOUNT,
};

/// Bytes a TRON transaction adds around the raw data: protobuf framing,
/// result entry and the signature.
const TRON_TX_OVERHEAD: u64 = 9 + 60 + 65;

/// Multiply a fee by a decimal safety factor, rounding up.
pub fn apply_fee_factor(fee: u128, factor: f64) -> u128 {
    let per_million = (factor * 1_000_000.0).round() as u128;
    (fee * per_million).div_ceil(1_000_000)
}

/// Message carrying the user's transfer and what it costs in TON up front.
struct PlannedTransfer {
    message: Message,
    fee: u128,
    real_fee: u128,
    /// Balance of the asset being sent.
    balance: u128,
}

pub struct TransferDrafter {
    rpc: Arc<dyn ChainRpc>,
    fee_factor: f64,
    retry: RetryPolicy,
    ton_cache: DraftCache<(String, TonDraftRequest)>,
    tron_cache: DraftCache<(Network, TronDraftRequest)>,
}

impl TransferDrafter {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: &DraftingConfig) -> Self {
        let ttl = Duration::from_millis(config.cache_ttl_ms);
        Self {
            rpc,
            fee_factor: config.fee_factor,
            retry: RetryPolicy::from(&config.retry),
            ton_cache: DraftCache::new(ttl),
            tron_cache: DraftCache::new(ttl),
        }
    }

    async fn call<T, F, Fut>(&self, op: &'static str, f: F) -> RpcResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        retry_with_backoff(self.retry, op, f).await
    }

    /// Validate a TON or jetton transfer and estimate its fee.
    ///
    /// Validation failures come back in [`DraftResult::error`]; `Err` means
    /// the chain could not be queried.
    pub async fn check_ton_draft(&self, account: &Account, request: &TonDraftRequest) -> RpcResult<DraftResult> {
        let key = (account.id.clone(), request.clone());
        self.ton_cache
            .get_or_compute(key, || self.compute_ton_draft(account, request))
            .await
    }

    async fn compute_ton_draft(&self, account: &Account, request: &TonDraftRequest) -> RpcResult<DraftResult> {
        let network = account.network;
        let mut result = check_to_address(self.rpc.as_ref(), network, &request.to_address).await?;
        if result.error.is_some() {
            return Ok(result);
        }
        let Some(to_address) = result.resolved_address.as_deref().and_then(|a| Address::parse(a).ok()) else {
            return Ok(result.with_error(DraftError::InvalidToAddress));
        };

        let is_initialized = self
            .call("rpc_is_initialized", || self.rpc.is_initialized(network, &to_address))
            .await?;

        let state_init = match request.state_init.as_deref() {
            Some(encoded) => match STANDARD.decode(encoded) {
                Ok(bytes) => Some(bytes),
                Err(_) => return Ok(result.with_error(DraftError::InvalidStateInit)),
            },
            None => None,
        };

        if result.is_bounceable && !is_initialized && state_init.is_none() {
            let has_transactions = self
                .call("rpc_has_transactions", || self.rpc.has_transactions(network, &to_address))
                .await?;
            result.is_to_address_new = !has_transactions;
            return Ok(result.with_error(DraftError::InactiveContract));
        }

        let owner = &account.ton.address;
        let wallet = self
            .call("rpc_wallet_info", || self.rpc.wallet_info(network, owner))
            .await?;

        let planned = match &request.token {
            None => PlannedTransfer {
                message: Message {
                    destination: to_address.clone(),
                    value: request.amount,
                    bounceable: result.is_bounceable,
                    state_init: state_init.clone(),
                    body: request.payload.clone(),
                },
                fee: 0,
                real_fee: 0,
                balance: wallet.balance,
            },
            Some(token) => self.plan_token_transfer(network, owner, &to_address, token, request, state_init).await?,
        };

        let is_full_ton_transfer = request.token.is_none() && wallet.balance == request.amount;
        let intent = TransactionIntent {
            messages: vec![planned.message],
            auth_type: Default::default(),
            seqno: wallet.seqno,
            valid_until: None,
            send_mode: if is_full_ton_transfer {
                SEND_MODE_CARRY_ALL_BALANCE
            } else {
                SEND_MODE_DEFAULT
            },
            hints: IntentHints {
                token_address: request.token.as_ref().map(|token| token.address.clone()),
            },
        };

        let signed = MockSigner::new(network, account.ton.clone())
            .sign_transactions(std::slice::from_ref(&intent))
            .map_err(|e| RpcError::Rejected(e.to_string()))?;
        let Some(transfer) = signed.first() else {
            return Err(RpcError::Rejected("nothing to emulate".into()));
        };

        let emulation = match self.call("rpc_emulate", || self.rpc.emulate(network, transfer)).await {
            Ok(emulation) => emulation,
            Err(e) if !e.is_retryable() && !wallet.is_initialized => {
                debug!(error = %e, "Emulation refused for undeployed wallet");
                return Ok(result.with_error(DraftError::WalletNotInitialized));
            }
            Err(e) => return Err(e),
        };
        let network_fee = apply_fee_factor(emulation.network_fee, self.fee_factor);
        let fee = planned.fee + network_fee;
        result.fee = Some(fee);
        result.real_fee = Some(planned.real_fee + network_fee);
        result.diesel = Some(DieselDraft::not_available());

        let is_enough_balance = match &request.token {
            None => wallet.balance >= fee + if is_full_ton_transfer { 0 } else { request.amount },
            Some(token) => {
                let can_transfer_gasfully = wallet.balance >= fee;
                if request.allow_gasless {
                    let ctx = DieselContext {
                        network,
                        wallet: owner,
                        version: account.ton.version,
                        token,
                        toncoin_balance: wallet.balance,
                        token_balance: planned.balance,
                        can_transfer_gasfully,
                    };
                    result.diesel = Some(estimate_diesel(self.rpc.as_ref(), &ctx).await?);
                }
                match result.diesel.as_ref().filter(|diesel| diesel.is_available()) {
                    Some(diesel) => request.amount + diesel.token_amount() <= planned.balance,
                    None => can_transfer_gasfully && request.amount <= planned.balance,
                }
            }
        };

        info!(
            account_id = %account.id,
            fee,
            token = request.token.as_ref().map(|t| t.slug.as_str()).unwrap_or("TON"),
            is_enough_balance,
            "TON draft checked"
        );

        Ok(if is_enough_balance {
            result
        } else {
            result.with_error(DraftError::InsufficientBalance)
        })
    }

    async fn plan_token_transfer(
        &self,
        network: Network,
        owner: &Address,
        to_address: &Address,
        token: &TokenRef,
        request: &TonDraftRequest,
        state_init: Option<Vec<u8>>,
    ) -> RpcResult<PlannedTransfer> {
        let token_wallet = self
            .call("rpc_token_wallet", || self.rpc.token_wallet(network, owner, &token.address))
            .await?;

        let body = JettonTransferBody {
            query_id: 0,
            amount: request.amount,
            destination: to_address.clone(),
            response_destination: owner.clone(),
            custom_payload: None,
            forward_amount: request.forward_amount.unwrap_or(TOKEN_TRANSFER_FORWARD_AMOUNT),
            forward_payload: request.payload.clone(),
        };

        // The token rides inside the body; the attached TON is the user's fee.
        Ok(PlannedTransfer {
            message: Message {
                destination: token_wallet.address,
                value: TOKEN_TRANSFER_AMOUNT,
                bounceable: true,
                state_init,
                body: Some(body.encode()),
            },
            fee: TOKEN_TRANSFER_AMOUNT,
            real_fee: TOKEN_TRANSFER_REAL_AMOUNT,
            balance: if token_wallet.is_deployed { token_wallet.balance } else { 0 },
        })
    }

    /// Fetch the gasless estimate assuming the wallet cannot pay in TON.
    pub async fn fetch_estimate_diesel(&self, account: &Account, token: &TokenRef) -> RpcResult<DieselDraft> {
        let network = account.network;
        let owner = &account.ton.address;
        let wallet = self
            .call("rpc_wallet_info", || self.rpc.wallet_info(network, owner))
            .await?;
        let token_wallet = self
            .call("rpc_token_wallet", || self.rpc.token_wallet(network, owner, &token.address))
            .await?;
        let ctx = DieselContext {
            network,
            wallet: owner,
            version: account.ton.version,
            token,
            toncoin_balance: wallet.balance,
            token_balance: token_wallet.balance,
            can_transfer_gasfully: false,
        };
        estimate_diesel(self.rpc.as_ref(), &ctx).await
    }

    /// Validate a TRX or TRC-20 transfer and estimate its fee.
    pub async fn check_tron_draft(&self, network: Network, request: &TronDraftRequest) -> RpcResult<DraftResult> {
        let key = (network, request.clone());
        self.tron_cache
            .get_or_compute(key, || self.compute_tron_draft(network, request))
            .await
    }

    async fn compute_tron_draft(&self, network: Network, request: &TronDraftRequest) -> RpcResult<DraftResult> {
        let mut result = DraftResult::default();
        let Ok(to) = TronAddress::parse(&request.to_address) else {
            return Ok(result.with_error(DraftError::InvalidToAddress));
        };
        result.resolved_address = Some(to.to_string());

        let from = TronAddress::parse(&request.from_address)
            .map_err(|e| RpcError::Rejected(format!("invalid sender address: {e}")))?;
        let token_address = request
            .token_address
            .as_deref()
            .map(TronAddress::parse)
            .transpose()
            .map_err(|e| RpcError::Rejected(format!("invalid token address: {e}")))?;
        let is_token = token_address.is_some();

        let transfer = TronTransferRequest {
            from,
            to,
            token_address,
            amount: request.amount,
        };
        let estimate = self
            .call("rpc_estimate_tron", || self.rpc.estimate_tron_transfer(network, &transfer))
            .await?;

        let size = TRON_TX_OVERHEAD + estimate.raw_size;
        let bandwidth_fee = if estimate.free_bandwidth > size {
            0
        } else {
            size as u128 * estimate.bandwidth_unit_fee as u128
        };
        let fee = estimate.energy_fee + bandwidth_fee;
        result.fee = Some(fee);
        result.real_fee = Some(fee);

        let trx_needed = if is_token { fee } else { request.amount + fee };
        let token_short = is_token && estimate.token_balance.unwrap_or(0) < request.amount;
        if estimate.trx_balance < trx_needed || token_short {
            return Ok(result.with_error(DraftError::InsufficientBalance));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for TransferDrafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferDrafter")
            .field("fee_factor", &self.fee_factor)
            .field("retry", &self.retry)
            .field("cached", &(self.ton_cache.len() + self.tron_cache.len()))
            .finish()
    }
}
