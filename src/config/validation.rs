//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, fee factor >= 1, known log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletCoreConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::{RetryConfig, WalletCoreConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &WalletCoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_retry("ledger.retry", &config.ledger.retry, &mut errors);
    validate_retry("drafting.retry", &config.drafting.retry, &mut errors);

    if config.ledger.transfer_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.transfer_timeout_secs", "must be greater than 0"));
    }

    if !config.drafting.fee_factor.is_finite() || config.drafting.fee_factor < 1.0 {
        errors.push(ValidationError::new(
            "drafting.fee_factor",
            format!("must be a finite number >= 1.0, got {}", config.drafting.fee_factor),
        ));
    }

    if config.drafting.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("drafting.rpc_timeout_secs", "must be greater than 0"));
    }

    if config.activity.slice_limit == 0 {
        errors.push(ValidationError::new("activity.slice_limit", "must be greater than 0"));
    }

    if config.activity.poll_interval_ms == 0 {
        errors.push(ValidationError::new("activity.poll_interval_ms", "must be greater than 0"));
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(prefix: &str, retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts == 0 {
        errors.push(ValidationError::new(
            format!("{}.max_attempts", prefix),
            "must be at least 1",
        ));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            format!("{}.base_delay_ms", prefix),
            "must not exceed max_delay_ms",
        ));
    }
}
