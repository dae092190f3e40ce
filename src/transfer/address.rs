//! Destination validation and domain resolution.

use tracing::debug;

use crate::blockchain::address::Address;
use crate::blockchain::client::{ChainRpc, RpcResult};
use crate::blockchain::types::Network;
use crate::transfer::types::{DraftError, DraftResult};

const DOMAIN_SUFFIXES: &[&str] = &[".ton", ".t.me"];

pub fn is_domain(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    DOMAIN_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Resolve and validate a user-entered destination.
///
/// On success the returned draft has `resolved_address` set and no error.
/// User-friendly, URL-safe addresses are required; test-only addresses are
/// refused on mainnet.
pub async fn check_to_address(rpc: &dyn ChainRpc, network: Network, input: &str) -> RpcResult<DraftResult> {
    let input = input.trim();
    let mut result = DraftResult::default();

    let address_text = if is_domain(input) {
        match rpc.resolve_domain(network, input).await? {
            Some(resolved) => {
                debug!(domain = input, address = %resolved.address, "Resolved domain");
                result.address_name = resolved.name.or_else(|| Some(input.to_string()));
                result.is_memo_required = resolved.is_memo_required;
                result.is_scam = resolved.is_scam;
                resolved.address
            }
            None => return Ok(result.with_error(DraftError::DomainNotResolved)),
        }
    } else {
        input.to_string()
    };
    result.resolved_address = Some(address_text.clone());

    let address = match Address::parse(&address_text) {
        Ok(address) => address,
        Err(_) => return Ok(result.with_error(DraftError::InvalidToAddress)),
    };
    result.is_bounceable = address.is_bounceable();

    if !address.is_user_friendly()
        || !address.is_url_safe()
        || (network == Network::Mainnet && address.is_test_only())
    {
        return Ok(result.with_error(DraftError::InvalidAddressFormat));
    }

    Ok(result)
}
