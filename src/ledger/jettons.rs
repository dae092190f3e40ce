//! Jetton identification for the device's "known jetton" screens.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::blockchain::address::Address;
use crate::blockchain::client::RpcResult;
use crate::blockchain::types::Network;

/// Jetton masters the device app ships names and decimals for.
///
/// The position is the jetton id the app expects, so entries are only ever
/// appended. Ids 0..=6 need app 2.2, 7..=9 need 2.6.1 and 10 needs 2.8.0.
pub const KNOWN_JETTONS: &[(&str, &str)] = &[
    ("USDT", "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs"),
    ("NOT", "EQAvlWFDxGF2lXm67y4yzC17wYKD9A0guwPkMs1gOsM__NOT"),
    ("tsTON", "EQC98_qAmNEptUtPc7W6xdHh_ZHrBUFpw5Ft_IzNU20QAJav"),
    ("wsTON", "EQB0SoxuGDx5qjVt0P_bPICFeWdFLBmVopHhjgfs0q-wsTON"),
    ("hTON", "EQDPdq8xjAhytYqfGSX8KcFWIReCufsB9Wdg0pLlYSO_h76w"),
    ("stTON", "EQDNhy-nxYFgUqzfUzImBEP67JqsyMIcyk2S5_RwNNEYku0k"),
    ("STON", "EQA2kCVNwVsil2EM2mB0SkXytxCqQjS4mttjDpnXmwG9T6bO"),
    ("DOGS", "EQCvxJy4eG8hyHBFsZ7eePxrRsUQSFE_jpptRAYBmcG_DOGS"),
    ("USDe", "EQAIb6KmdfdDR7CN1GBqVJuP25iCnLKCvBlJ07Evuu2dzP5f"),
    ("tsUSDe", "EQDQ5UUyPHrLcQJlPAczd_fjxn8SLrlNQwolBznxCdSlfQwr"),
    ("XAUt0", "EQA1R_LuQCLHlMgOo1S4G7Y7W1cd0FrAkbA10Zq7rddKxi9k"),
];

/// Jetton id of `master`, when the device knows it.
pub fn known_jetton_id(master: &Address) -> Option<u32> {
    KNOWN_JETTONS
        .iter()
        .position(|(_, address)| {
            address
                .parse::<Address>()
                .map(|known| known == *master)
                .unwrap_or(false)
        })
        .map(|id| id as u32)
}

/// Looks up the master contract of a jetton wallet.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve_token_address(
        &self,
        network: Network,
        token_wallet: &Address,
    ) -> RpcResult<Option<Address>>;
}

/// Caches token wallet to master lookups.
///
/// Masters never change for a given jetton wallet, so entries never expire.
/// Failed lookups are not cached.
pub struct JettonRegistry {
    resolver: Arc<dyn TokenResolver>,
    masters: DashMap<(Network, Address), Address>,
}

impl JettonRegistry {
    pub fn new(resolver: Arc<dyn TokenResolver>) -> Self {
        Self {
            resolver,
            masters: DashMap::new(),
        }
    }

    pub async fn master_of(&self, network: Network, token_wallet: &Address) -> Option<Address> {
        let key = (network, token_wallet.clone());
        if let Some(master) = self.masters.get(&key) {
            return Some(master.clone());
        }

        match self.resolver.resolve_token_address(network, token_wallet).await {
            Ok(Some(master)) => {
                debug!(
                    token_wallet = %token_wallet,
                    master = %master,
                    "Resolved jetton master"
                );
                self.masters.insert(key, master.clone());
                Some(master)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    token_wallet = %token_wallet,
                    error = %e,
                    "Jetton master lookup failed"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for JettonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JettonRegistry")
            .field("cached", &self.masters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::RpcError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenResolver for CountingResolver {
        async fn resolve_token_address(
            &self,
            _network: Network,
            _token_wallet: &Address,
        ) -> RpcResult<Option<Address>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RpcError::Network("down".into()));
            }
            Ok(Some(KNOWN_JETTONS[0].1.parse().unwrap()))
        }
    }

    #[test]
    fn test_known_ids() {
        let usdt: Address = KNOWN_JETTONS[0].1.parse().unwrap();
        let dogs: Address = "EQCvxJy4eG8hyHBFsZ7eePxrRsUQSFE_jpptRAYBmcG_DOGS".parse().unwrap();
        assert_eq!(known_jetton_id(&usdt), Some(0));
        assert_eq!(known_jetton_id(&dogs), Some(7));
        assert_eq!(known_jetton_id(&Address::new(0, [9; 32])), None);
    }

    #[test]
    fn test_every_known_master_parses() {
        assert_eq!(KNOWN_JETTONS.len(), 11);
        for (id, (symbol, master)) in KNOWN_JETTONS.iter().enumerate() {
            let address: Address = master.parse().unwrap_or_else(|_| panic!("{symbol} master"));
            assert_eq!(known_jetton_id(&address), Some(id as u32), "{symbol}");
        }
    }

    #[tokio::test]
    async fn test_lookups_are_cached() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let registry = JettonRegistry::new(resolver.clone());
        let wallet = Address::new(0, [7; 32]);

        for _ in 0..3 {
            let master = registry.master_of(Network::Mainnet, &wallet).await.unwrap();
            assert_eq!(known_jetton_id(&master), Some(0));
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_retried_next_time() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let registry = JettonRegistry::new(resolver.clone());
        let wallet = Address::new(0, [7; 32]);

        assert!(registry.master_of(Network::Mainnet, &wallet).await.is_none());
        assert!(registry.master_of(Network::Mainnet, &wallet).await.is_none());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }
}
