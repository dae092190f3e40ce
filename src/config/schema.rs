//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet
//! core. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletCoreConfig {
    /// Hardware device signing.
    pub ledger: LedgerConfig,

    /// Fee estimation and draft validation.
    pub drafting: DraftingConfig,

    /// Activity polling and merging.
    pub activity: ActivityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Retry configuration shared by device and RPC calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Ledger device configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Retries on transport failures (disconnects, wrong app open).
    pub retry: RetryConfig,

    /// Validity window for signed transfers without an explicit timeout.
    pub transfer_timeout_secs: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 5,
                base_delay_ms: 250,
                max_delay_ms: 2000,
            },
            transfer_timeout_secs: 600,
        }
    }
}

/// Transfer drafting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DraftingConfig {
    /// How long a successful draft result is reused, in milliseconds.
    pub cache_ttl_ms: u64,

    /// Multiplier applied to the emulated network fee.
    pub fee_factor: f64,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Retries on transient RPC failures.
    pub retry: RetryConfig,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5000,
            fee_factor: 1.15,
            rpc_timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

/// Activity sync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Items requested per feed page.
    pub slice_limit: usize,

    /// Interval between polls for new activity, in milliseconds.
    pub poll_interval_ms: u64,

    /// An incomplete trailing trace is trimmed only if it has fewer items than this.
    pub trace_trim_threshold: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            slice_limit: 100,
            poll_interval_ms: 5000,
            trace_trim_threshold: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WalletCoreConfig::default();
        assert_eq!(config.ledger.retry.max_attempts, 5);
        assert_eq!(config.ledger.transfer_timeout_secs, 600);
        assert_eq!(config.drafting.cache_ttl_ms, 5000);
        assert!((config.drafting.fee_factor - 1.15).abs() < f64::EPSILON);
        assert_eq!(config.activity.trace_trim_threshold, 10);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WalletCoreConfig = toml::from_str(
            r#"
            [drafting]
            fee_factor = 1.3

            [activity]
            slice_limit = 50
            "#,
        )
        .unwrap();
        assert!((config.drafting.fee_factor - 1.3).abs() < f64::EPSILON);
        assert_eq!(config.drafting.cache_ttl_ms, 5000);
        assert_eq!(config.activity.slice_limit, 50);
        assert_eq!(config.ledger.retry.max_attempts, 5);
    }
}
