//! Chain log feed.
//!
//! `LogSource` opens subscriptions; `LogSubscription` yields batches in
//! chain order. `WsLogSource` drives the cluster's `logsSubscribe` API
//! through the SDK's `PubsubClient`, filtered to transactions that mention
//! the program.
//!
//! The pubsub stream borrows its client, so each subscription runs in a
//! forwarding task that owns both and hands batches over a channel. The
//! SDK drops notifications it cannot decode into `RpcLogsResponse`, which
//! includes any log entry that is not a string; indices into `lines` are
//! therefore always the program's own line positions.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_client::rpc_response::{Response, RpcLogsResponse};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::chain::types::{Commitment, Pubkey};
use crate::relay::types::{RawLogBatch, TransportError};

const BATCH_BUFFER: usize = 64;

/// Upper bound on unsubscribe and client shutdown.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait LogSource: Send {
    async fn subscribe(
        &mut self,
        program_id: &Pubkey,
        commitment: Commitment,
    ) -> Result<Box<dyn LogSubscription>, TransportError>;
}

/// A live subscription. `recv` must be cancel-safe; it is polled inside `select!`.
#[async_trait]
pub trait LogSubscription: Send {
    async fn recv(&mut self) -> Result<RawLogBatch, TransportError>;

    /// Release the subscription. Best effort; never fails.
    async fn unsubscribe(self: Box<Self>);
}

/// WebSocket log source.
#[derive(Debug, Clone)]
pub struct WsLogSource {
    ws_url: String,
    connect_timeout: Duration,
    idle_timeout: Option<Duration>,
}

impl WsLogSource {
    pub fn new(ws_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            ws_url: ws_url.into(),
            connect_timeout,
            idle_timeout: None,
        }
    }

    /// Treat a subscription that stays silent this long as dropped. A
    /// half-open socket otherwise blocks `recv` forever.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    async fn open(
        &self,
        program_id: &Pubkey,
        commitment: Commitment,
    ) -> Result<WsSubscription, TransportError> {
        let client = timeout(self.connect_timeout, PubsubClient::new(&self.ws_url))
            .await
            .map_err(|_| {
                TransportError::ConnectionFailed(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let filter = RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]);
        let config = RpcTransactionLogsConfig {
            commitment: Some(commitment.to_config()),
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = tokio::spawn(forward_logs(client, filter, config, ready_tx, batch_tx, stop_rx));

        match timeout(self.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(WsSubscription {
                batches: batch_rx,
                stop: stop_tx,
                worker,
                idle_timeout: self.idle_timeout,
            }),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(TransportError::SubscriptionFailed(
                "forwarding task ended before confirming".to_string(),
            )),
            Err(_) => {
                worker.abort();
                Err(TransportError::SubscriptionFailed(format!(
                    "logsSubscribe unconfirmed after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl LogSource for WsLogSource {
    async fn subscribe(
        &mut self,
        program_id: &Pubkey,
        commitment: Commitment,
    ) -> Result<Box<dyn LogSubscription>, TransportError> {
        let subscription = self.open(program_id, commitment).await?;

        tracing::info!(
            ws_url = %self.ws_url,
            program = %program_id,
            commitment = %commitment,
            idle_timeout_secs = self.idle_timeout.map(|d| d.as_secs()),
            "Log subscription established"
        );
        Ok(Box::new(subscription))
    }
}

/// Owns the pubsub client for the life of one subscription.
async fn forward_logs(
    client: PubsubClient,
    filter: RpcTransactionLogsFilter,
    config: RpcTransactionLogsConfig,
    ready: oneshot::Sender<Result<(), TransportError>>,
    batches: mpsc::Sender<RawLogBatch>,
    mut stop: oneshot::Receiver<()>,
) {
    let (mut notifications, unsubscribe) = match client.logs_subscribe(filter, config).await {
        Ok(subscription) => subscription,
        Err(e) => {
            let _ = ready.send(Err(TransportError::SubscriptionFailed(e.to_string())));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = notifications.next() => match next {
                Some(response) => {
                    if batches.send(batch_from_response(response)).await.is_err() {
                        break;
                    }
                }
                None => {
                    tracing::debug!("Pubsub stream ended");
                    break;
                }
            },
        }
    }

    drop(notifications);
    if timeout(RELEASE_TIMEOUT, unsubscribe()).await.is_err() {
        tracing::debug!("logsUnsubscribe not acknowledged");
    }
    match timeout(RELEASE_TIMEOUT, client.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Pubsub client shutdown failed"),
        Err(_) => tracing::debug!("Pubsub client shutdown timed out"),
    }
}

/// Convert a decoded `logsNotification` into a batch.
fn batch_from_response(response: Response<RpcLogsResponse>) -> RawLogBatch {
    let value = response.value;
    let error = value
        .err
        .map(|e| serde_json::to_string(&e).unwrap_or_else(|_| format!("{:?}", e)));
    RawLogBatch {
        transaction_id: value.signature,
        slot: response.context.slot,
        failed: error.is_some(),
        error,
        lines: value.logs,
    }
}

struct WsSubscription {
    batches: mpsc::Receiver<RawLogBatch>,
    stop: oneshot::Sender<()>,
    worker: JoinHandle<()>,
    idle_timeout: Option<Duration>,
}

#[async_trait]
impl LogSubscription for WsSubscription {
    async fn recv(&mut self) -> Result<RawLogBatch, TransportError> {
        let next = match self.idle_timeout {
            Some(idle) => timeout(idle, self.batches.recv())
                .await
                .map_err(|_| TransportError::Idle(idle))?,
            None => self.batches.recv().await,
        };
        next.ok_or(TransportError::ConnectionClosed)
    }

    async fn unsubscribe(self: Box<Self>) {
        let WsSubscription {
            batches,
            stop,
            worker,
            ..
        } = *self;
        let _ = stop.send(());
        drop(batches);
        if timeout(RELEASE_TIMEOUT * 2, worker).await.is_err() {
            tracing::debug!("Log forwarding task did not stop in time");
        }
        tracing::info!("Log subscription released");
    }
}
