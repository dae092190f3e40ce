//! Chain-level building blocks.
//!
//! # Data Flow
//! ```text
//! TransactionIntent (types.rs)
//!     → body.rs (message bodies: comments, jetton/NFT transfers, ...)
//!     → transfer.rs (wallet-version specific signing payload, assembly)
//!     → client.rs (ChainRpc / ActivityIndexer collaborators, failover)
//! ```
//!
//! # Security Constraints
//! - Nothing here sees key material; signing happens in `signer`
//! - All RPC calls go through a per-call timeout

pub mod address;
pub mod body;
pub mod client;
pub mod transfer;
pub mod types;

pub use address::{Address, AddressError, TronAddress};
pub use client::{ActivityIndexer, ChainRpc, FailoverRpc, RpcError, RpcResult};
pub use transfer::SignedTransfer;
pub use types::{Account, AccountKind, Message, Network, TransactionIntent, WalletVersion};
