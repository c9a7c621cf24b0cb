//! Cluster RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint(s) through the SDK's nonblocking client
//! - Fetch the latest blockhash and submit signed transactions
//! - Separate network-side failures from chain-side rejections
//! - Provide health check for cluster connectivity
//!
//! Reads fail over across every configured endpoint. `sendTransaction` goes
//! to the primary only: a timed-out submit may still land, and resending it
//! elsewhere would submit the same transaction twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::transaction::Transaction;
use tokio::time::timeout;

use crate::chain::types::{ChainConfig, ChainError, ChainResult, Commitment, Hash, Signature};
use crate::observability::metrics;

/// Network handle used by the submitter.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Latest blockhash at the client's commitment level.
    async fn get_latest_blockhash(&self) -> ChainResult<Hash>;

    /// Submit a signed transaction once; returns its signature.
    async fn send_transaction(&self, tx: &Transaction) -> ChainResult<Signature>;
}

/// RPC client wrapper with failover support for reads.
#[derive(Clone)]
pub struct RpcClient {
    /// Providers in priority order (primary + failovers).
    providers: Vec<Arc<SolanaRpcClient>>,
    commitment: Commitment,
    timeout_duration: Duration,
}

impl RpcClient {
    /// Create a new RPC client.
    ///
    /// Invalid failover URLs are skipped with a warning; an invalid primary
    /// URL is an error.
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let connect = |url: url::Url| {
            Arc::new(SolanaRpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout_duration,
                config.commitment.to_config(),
            ))
        };

        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            ChainError::Transport(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let mut providers = vec![connect(primary)];

        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => providers.push(connect(url)),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            commitment = %config.commitment,
            "RPC client initialized"
        );

        Ok(Self {
            providers,
            commitment: config.commitment,
            timeout_duration,
        })
    }

    /// Current slot; used as a liveness check.
    pub async fn get_slot(&self) -> ChainResult<u64> {
        let mut last_err = ChainError::Transport("No RPC providers configured".to_string());
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_slot()).await {
                Ok(Ok(slot)) => return Ok(slot),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "getSlot failed, trying next provider");
                    last_err = e.into();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "getSlot timed out, trying next provider");
                    last_err = ChainError::Timeout(self.timeout_duration.as_secs());
                }
            }
        }
        Err(last_err)
    }

    /// Check if the cluster is reachable.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_slot().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    fn primary(&self) -> ChainResult<&SolanaRpcClient> {
        self.providers
            .first()
            .map(Arc::as_ref)
            .ok_or_else(|| ChainError::Transport("No RPC providers configured".to_string()))
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        let mut last_err = ChainError::Transport("No RPC providers configured".to_string());
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_latest_blockhash()).await {
                Ok(Ok(blockhash)) => return Ok(blockhash),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "getLatestBlockhash failed, trying next provider");
                    last_err = e.into();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "getLatestBlockhash timed out, trying next provider");
                    last_err = ChainError::Timeout(self.timeout_duration.as_secs());
                }
            }
        }
        Err(last_err)
    }

    async fn send_transaction(&self, tx: &Transaction) -> ChainResult<Signature> {
        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(self.commitment.to_config().commitment),
            ..RpcSendTransactionConfig::default()
        };
        let send = self.primary()?.send_transaction_with_config(tx, config);
        match timeout(self.timeout_duration, send).await {
            Ok(result) => result.map_err(ChainError::from),
            Err(_) => Err(ChainError::Timeout(self.timeout_duration.as_secs())),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("providers", &self.providers.len())
            .field("commitment", &self.commitment)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
