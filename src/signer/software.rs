//! Transfer signing with key material held in memory.

use crate::blockchain::transfer::{signing_hash, signing_payload, wallet_id, SignedTransfer, TransferParams};
use crate::blockchain::types::{AuthType, Network, TonWallet, TransactionIntent, WalletVersion};
use crate::signer::types::{SignError, SignResult};

/// Parameters the wallet contract will check for `intent`.
pub(crate) fn transfer_params(
    wallet: &TonWallet,
    network: Network,
    subwallet_id: Option<u32>,
    intent: &TransactionIntent,
) -> TransferParams {
    TransferParams {
        version: wallet.version,
        wallet_id: wallet_id(wallet.version, network, wallet.address.workchain(), subwallet_id),
        valid_until: intent.expires_at(),
    }
}

/// Only W5 wallets accept anything but owner-signed external messages.
pub(crate) fn check_auth_type(wallet: &TonWallet, intent: &TransactionIntent) -> SignResult<()> {
    if wallet.version != WalletVersion::W5 && intent.auth_type != AuthType::External {
        return Err(SignError::UnsupportedAuthType(wallet.version.to_string()));
    }
    Ok(())
}

/// Sign every intent with `sign`, preserving input order.
///
/// # Panics
/// If an intent has no messages.
pub(crate) fn sign_transfers<F>(
    intents: &[TransactionIntent],
    wallet: &TonWallet,
    network: Network,
    sign: F,
) -> SignResult<Vec<SignedTransfer>>
where
    F: Fn(&[u8; 32]) -> [u8; 64],
{
    intents
        .iter()
        .map(|intent| {
            assert!(!intent.messages.is_empty(), "transaction intent without messages");
            check_auth_type(wallet, intent)?;

            let params = transfer_params(wallet, network, None, intent);
            let payload = signing_payload(intent, &params);
            let signature = sign(&signing_hash(&payload));
            Ok(SignedTransfer::assemble(
                wallet.version,
                payload,
                &signature,
                intent.seqno,
                params.valid_until,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::address::Address;
    use crate::blockchain::types::Message;

    fn wallet(version: WalletVersion) -> TonWallet {
        TonWallet {
            address: Address::new(0, [1; 32]),
            public_key: None,
            version,
            is_initialized: true,
        }
    }

    fn intent(auth_type: AuthType) -> TransactionIntent {
        let mut intent = TransactionIntent::single(
            Message {
                destination: Address::new(0, [2; 32]),
                value: 1,
                bounceable: false,
                state_init: None,
                body: None,
            },
            4,
        );
        intent.auth_type = auth_type;
        intent.valid_until = Some(1_000);
        intent
    }

    #[test]
    fn test_internal_auth_only_on_w5() {
        let result = sign_transfers(&[intent(AuthType::Internal)], &wallet(WalletVersion::V4R2), Network::Mainnet, |_| [0; 64]);
        assert_eq!(result, Err(SignError::UnsupportedAuthType("v4R2".into())));

        let result = sign_transfers(&[intent(AuthType::Internal)], &wallet(WalletVersion::W5), Network::Mainnet, |_| [0; 64]);
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let mut first = intent(AuthType::External);
        first.seqno = 1;
        let mut second = intent(AuthType::External);
        second.seqno = 2;
        let signed = sign_transfers(&[first, second], &wallet(WalletVersion::V4R2), Network::Mainnet, |_| [7; 64]).unwrap();
        assert_eq!(signed.iter().map(|s| s.seqno).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(signed[0].valid_until, 1_000);
        assert_eq!(&signed[0].bytes[..64], &[7u8; 64][..]);
    }

    #[test]
    #[should_panic(expected = "without messages")]
    fn test_empty_intent_panics() {
        let mut empty = intent(AuthType::External);
        empty.messages.clear();
        let _ = sign_transfers(&[empty], &wallet(WalletVersion::V4R2), Network::Mainnet, |_| [0; 64]);
    }
}
