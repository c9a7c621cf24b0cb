//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML file.
//! Every section has defaults so a minimal file only names what differs.

use serde::{Deserialize, Serialize};

use crate::chain::types::Commitment;

/// Mainline bridge program.
pub const DEFAULT_PROGRAM_ID: &str = "BKGhwbiTHdUxcuWzZtDWyioRBieDEXTtgEk8u1zskZnk";

/// Proxy account the bridge program logs for legitimate shields.
pub const DEFAULT_TRUSTED_PROXY: &str = "8WUP1RGTDTZGYBjkHQfjnwMbnnk25hnE6Du7vFpaq1QK";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Cluster endpoints.
    pub chain: ChainConfig,

    /// Which program and proxy to trust.
    pub bridge: BridgeConfig,

    /// Reconnect policy for the log subscription.
    pub subscription: SubscriptionConfig,

    pub dedup: DedupConfig,

    pub observability: ObservabilityConfig,
}

/// Cluster connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// WebSocket endpoint for log subscriptions.
    pub ws_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order after `rpc_url`.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds. Also bounds WebSocket subscribe.
    pub rpc_timeout_secs: u64,

    /// Only `finalized` is accepted.
    pub commitment: Commitment,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            ws_url: "wss://api.devnet.solana.com".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            commitment: Commitment::Finalized,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bridge program whose logs are subscribed to (base58).
    pub program_id: String,

    /// The only proxy address a shield event may carry (base58).
    pub trusted_proxy: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            trusted_proxy: DEFAULT_TRUSTED_PROXY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Base delay for exponential reconnect backoff in milliseconds.
    pub reconnect_base_ms: u64,

    /// Ceiling for the reconnect delay in milliseconds.
    pub reconnect_max_ms: u64,

    /// Consecutive failed reconnects before giving up. 0 retries forever.
    pub max_reconnect_attempts: u32,

    /// Resubscribe after this many seconds without a notification. 0 disables.
    pub idle_timeout_secs: u64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
            max_reconnect_attempts: 0,
            idle_timeout_secs: 600,
        }
    }
}

/// Processed-transaction persistence.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// JSON file of processed signatures. In-memory only when unset.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
