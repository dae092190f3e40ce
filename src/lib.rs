//! Signing and transaction-reconciliation core of a non-custodial TON/TRON wallet.
//!
//! # Architecture Overview
//!
//! ```text
//!   TransactionIntent
//!          │
//!          ▼
//!   ┌──────────────┐   fee, validation   ┌───────────────┐
//!   │   transfer   │────────────────────▶│  ChainRpc     │ (injected, failover)
//!   │   drafting   │◀────────────────────│  collaborator │
//!   └──────┬───────┘                     └───────────────┘
//!          │ confirmed by user
//!          ▼
//!   ┌──────────────┐   Ledger only   ┌──────────────┐    ┌───────────────┐
//!   │    signer    │────────────────▶│    ledger    │───▶│ DeviceChannel │ (injected)
//!   │ mnemonic/    │                 │ translator + │    └───────────────┘
//!   │ ledger/mock  │                 │ device       │
//!   └──────┬───────┘                 └──────────────┘
//!          │ signed bytes
//!          ▼
//!   submit ──▶ local placeholder ──▶ ┌──────────────┐◀── indexer feeds (sync)
//!                                    │   activity   │
//!                                    │ merge engine │──▶ canonical timeline
//!                                    └──────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

// Core subsystems
pub mod activity;
pub mod blockchain;
pub mod ledger;
pub mod signer;
pub mod transfer;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::WalletCoreConfig;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use signer::{Signer, SignerFactory, SignerRequest};
