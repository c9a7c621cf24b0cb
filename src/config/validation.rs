//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every error is collected so an
//! operator sees the whole list at once.

use std::fmt;
use std::net::SocketAddr;

use crate::chain::types::{Commitment, Pubkey};
use crate::config::schema::RelayConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "chain.rpc_url", &config.chain.rpc_url, &["http", "https"]);
    check_url(&mut errors, "chain.ws_url", &config.chain.ws_url, &["ws", "wss"]);
    for url in &config.chain.failover_urls {
        check_url(&mut errors, "chain.failover_urls", url, &["http", "https"]);
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.chain.commitment != Commitment::Finalized {
        errors.push(ValidationError::new(
            "chain.commitment",
            format!(
                "'{}' can be rolled back; only 'finalized' is accepted",
                config.chain.commitment
            ),
        ));
    }

    check_pubkey(&mut errors, "bridge.program_id", &config.bridge.program_id);
    check_pubkey(&mut errors, "bridge.trusted_proxy", &config.bridge.trusted_proxy);

    let sub = &config.subscription;
    if sub.reconnect_base_ms == 0 {
        errors.push(ValidationError::new(
            "subscription.reconnect_base_ms",
            "must be greater than 0",
        ));
    }
    if sub.reconnect_base_ms > sub.reconnect_max_ms {
        errors.push(ValidationError::new(
            "subscription.reconnect_max_ms",
            format!("must be at least reconnect_base_ms ({})", sub.reconnect_base_ms),
        ));
    }

    if matches!(config.dedup.persistence_path.as_deref(), Some("")) {
        errors.push(ValidationError::new("dedup.persistence_path", "must not be empty"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str, schemes: &[&str]) {
    match url::Url::parse(raw) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("'{}' has scheme '{}', expected one of {:?}", raw, url.scheme(), schemes),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("'{}': {}", raw, e))),
    }
}

fn check_pubkey(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str) {
    if let Err(e) = raw.parse::<Pubkey>() {
        errors.push(ValidationError::new(field, e.to_string()));
    }
}
