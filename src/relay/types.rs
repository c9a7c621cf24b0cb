//! Event path types.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Token amount as found in the log.
///
/// `raw` is the verbatim text and the authoritative value for audit;
/// `value` is `None` when the text did not parse as a `u64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Amount {
    pub raw: String,
    pub value: Option<u64>,
}

impl Amount {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            value: raw.parse().ok(),
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self {
            raw: value.to_string(),
            value: Some(value),
        }
    }
}

/// A decoded shield intent.
///
/// Only produced by the codec; fields are read-only to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShieldEvent {
    pub(crate) proxy_address: String,
    pub(crate) destination_address: String,
    pub(crate) asset_id: String,
    pub(crate) amount: Amount,
}

impl ShieldEvent {
    pub fn proxy_address(&self) -> &str {
        &self.proxy_address
    }

    /// Incognito payment address receiving the minted tokens.
    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }
}

/// One notification from the log subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawLogBatch {
    /// Base58 transaction signature.
    pub transaction_id: String,
    pub slot: u64,
    /// Chain-reported execution failure.
    pub failed: bool,
    /// Chain-reported error, when `failed`.
    pub error: Option<String>,
    /// Log lines in emission order.
    pub lines: Vec<String>,
}

/// Why a batch produced no event. All variants are non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("transaction failed on chain: {0}")]
    ChainFailure(String),

    #[error("too few log lines: {found}")]
    TooFewLines { found: usize },

    #[error("not a shield instruction: {line:?}")]
    NotShieldInstruction { line: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("untrusted proxy {found:?}")]
    TrustViolation { found: String },
}

impl Rejection {
    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::ChainFailure(_) => "chain_failure",
            Rejection::TooFewLines { .. } | Rejection::NotShieldInstruction { .. } => {
                "validation_rejection"
            }
            Rejection::MalformedPayload(_) => "malformed_payload",
            Rejection::TrustViolation { .. } => "trust_violation",
        }
    }
}

/// Subscription or network failure. Recovered by reconnecting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("no notification within {0:?}")]
    Idle(Duration),
}

/// Downstream refused or failed to take an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Failed(String),
}
