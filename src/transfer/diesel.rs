//! Gasless ("diesel") transfer decisions.
//!
//! A relayer can pay the TON fee of a token transfer in exchange for some of
//! the token (or for stars). It is offered only when the wallet lacks TON for
//! the fee and holds enough of the token to pay the relayer, or when an
//! earlier gasless transfer is still pending.

use tracing::debug;

use crate::blockchain::address::Address;
use crate::blockchain::client::{ChainRpc, DieselRequest, RpcResult};
use crate::blockchain::types::{unix_now_secs, Network, WalletVersion};
use crate::transfer::types::{DieselDraft, TokenRef, DEFAULT_FEE, TOKEN_TRANSFER_AMOUNT, TOKEN_TRANSFER_REAL_AMOUNT};

/// Wallets holding at least this much TON never go gasless.
pub const MAX_BALANCE_WITH_CHECK_DIESEL: u128 = 100_000_000;

/// A pending gasless transfer older than this no longer forces gasless mode.
pub const PENDING_DIESEL_TIMEOUT_SECS: u64 = 15 * 60;

/// TON a gasless transfer of `token` spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DieselToncoinFee {
    pub amount: u128,
    pub real_fee: u128,
    pub is_stars: bool,
}

pub fn diesel_toncoin_fee(token: &TokenRef) -> DieselToncoinFee {
    let is_stars = !token.is_gasless_enabled && token.is_stars_enabled;
    let (mut amount, mut real_fee) = (TOKEN_TRANSFER_AMOUNT, TOKEN_TRANSFER_REAL_AMOUNT);

    // The relayer flow is two transactions: the transfer and the payment to the relayer.
    if !is_stars {
        amount *= 2;
        real_fee *= 2;
    }

    DieselToncoinFee {
        amount: amount + DEFAULT_FEE,
        real_fee: real_fee + DEFAULT_FEE,
        is_stars,
    }
}

/// Wallet facts a diesel decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct DieselContext<'a> {
    pub network: Network,
    pub wallet: &'a Address,
    pub version: WalletVersion,
    pub token: &'a TokenRef,
    pub toncoin_balance: u128,
    pub token_balance: u128,
    pub can_transfer_gasfully: bool,
}

pub async fn estimate_diesel(rpc: &dyn ChainRpc, ctx: &DieselContext<'_>) -> RpcResult<DieselDraft> {
    if ctx.network != Network::Mainnet {
        return Ok(DieselDraft::not_available());
    }
    if !ctx.token.is_gasless_enabled && !ctx.token.is_stars_enabled {
        return Ok(DieselDraft::not_available());
    }

    let fee = diesel_toncoin_fee(ctx.token);
    if ctx.toncoin_balance >= MAX_BALANCE_WITH_CHECK_DIESEL || fee.amount <= ctx.toncoin_balance {
        return Ok(DieselDraft::not_available());
    }
    let toncoin_needed = fee.amount - ctx.toncoin_balance;

    let estimate = rpc
        .estimate_diesel(&DieselRequest {
            address: ctx.wallet.clone(),
            token_address: ctx.token.address.clone(),
            toncoin_amount: toncoin_needed,
            is_w5: ctx.version == WalletVersion::W5,
            is_stars: fee.is_stars,
        })
        .await?;

    let diesel = DieselDraft {
        status: estimate.status,
        amount: estimate.amount,
        native_amount: toncoin_needed,
        remaining_fee: ctx.toncoin_balance,
        real_fee: fee.real_fee,
    };

    let token_amount = diesel.token_amount();
    if token_amount == 0 {
        return Ok(diesel);
    }

    let can_pay_diesel = ctx.token_balance >= token_amount;
    let pending_not_expired = estimate.pending_created_at.is_some_and(|created| {
        (unix_now_secs() as u64).saturating_sub(created) < PENDING_DIESEL_TIMEOUT_SECS
    });

    // When neither TON nor the token covers the fee, show the TON fee.
    let should_be_gasless = (!ctx.can_transfer_gasfully && can_pay_diesel) || pending_not_expired;
    debug!(
        token = %ctx.token.slug,
        status = ?diesel.status,
        can_pay_diesel,
        pending_not_expired,
        should_be_gasless,
        "Diesel decision"
    );

    Ok(if should_be_gasless {
        diesel
    } else {
        DieselDraft::not_available()
    })
}
