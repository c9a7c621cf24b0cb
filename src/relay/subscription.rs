//! The log subscription loop.
//!
//! # States
//! ```text
//! Connecting → Subscribed → Receiving ⇄ Reconnecting → Closed
//! ```
//!
//! - Connecting: open a `finalized` subscription filtered to the program
//! - Receiving: wait for the next batch or shutdown (the only suspension point)
//! - Reconnecting: release the dropped subscription, back off, subscribe again
//! - Closed: shutdown observed; the subscription has been released
//!
//! No per-batch failure leaves the loop. Only shutdown or running out of
//! reconnect attempts ends it.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, watch};

use crate::chain::types::{ChainError, Commitment, Pubkey};
use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::dedup::DedupTracker;
use crate::relay::processor::{report_rejection, ShieldProcessor};
use crate::relay::sink::ShieldSink;
use crate::relay::source::{LogSource, LogSubscription};
use crate::relay::types::{RawLogBatch, TransportError};
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Connecting,
    Subscribed,
    Receiving,
    Reconnecting,
    Closed,
}

impl LoopState {
    /// Gauge value for metrics.
    pub fn as_gauge(&self) -> f64 {
        match self {
            LoopState::Connecting => 0.0,
            LoopState::Subscribed => 1.0,
            LoopState::Receiving => 2.0,
            LoopState::Reconnecting => 3.0,
            LoopState::Closed => 4.0,
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoopStats {
    pub batches: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub duplicates: u64,
    pub sink_failures: u64,
    pub reconnects: u64,
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("gave up after {attempts} reconnect attempts: {last}")]
    ReconnectExhausted { attempts: u32, last: TransportError },
}

/// The only commitment the loop subscribes at. Earlier levels can be
/// rolled back and would relay shields that never settled.
pub const SUBSCRIPTION_COMMITMENT: Commitment = Commitment::Finalized;

/// Immutable settings injected at construction.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub program_id: Pubkey,
    pub trusted_proxy: String,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    /// 0 means retry forever.
    pub max_reconnect_attempts: u32,
}

impl LoopConfig {
    pub fn from_config(config: &RelayConfig) -> Result<Self, ChainError> {
        let program_id = config.bridge.program_id.parse().map_err(|e| {
            ChainError::InvalidKey(format!(
                "Invalid program id '{}': {}",
                config.bridge.program_id, e
            ))
        })?;
        Ok(Self {
            program_id,
            trusted_proxy: config.bridge.trusted_proxy.clone(),
            reconnect_base_ms: config.subscription.reconnect_base_ms,
            reconnect_max_ms: config.subscription.reconnect_max_ms,
            max_reconnect_attempts: config.subscription.max_reconnect_attempts,
        })
    }
}

enum Exit {
    Shutdown,
    Transport(TransportError),
}

pub struct SubscriptionLoop<S: LogSource> {
    source: S,
    config: LoopConfig,
    processor: ShieldProcessor,
    dedup: DedupTracker,
    sink: Arc<dyn ShieldSink>,
    state_tx: watch::Sender<LoopState>,
    stats: LoopStats,
}

impl<S: LogSource> SubscriptionLoop<S> {
    pub fn new(
        source: S,
        config: LoopConfig,
        dedup: DedupTracker,
        sink: Arc<dyn ShieldSink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Connecting);
        Self {
            processor: ShieldProcessor::new(config.trusted_proxy.clone()),
            source,
            config,
            dedup,
            sink,
            state_tx,
            stats: LoopStats::default(),
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: LoopState) {
        metrics::record_subscription_state(state.as_gauge());
        self.state_tx.send_replace(state);
    }

    /// Run until shutdown. The shutdown sender being dropped also stops the loop.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<LoopStats, LoopError> {
        tracing::info!(
            program = %self.config.program_id,
            commitment = %SUBSCRIPTION_COMMITMENT,
            "Subscription loop starting"
        );

        let mut attempt: u32 = 0;
        self.set_state(LoopState::Connecting);

        loop {
            let subscribed = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                res = self.source.subscribe(&self.config.program_id, SUBSCRIPTION_COMMITMENT) => Some(res),
            };

            let mut subscription = match subscribed {
                None => return Ok(self.close()),
                Some(Ok(subscription)) => {
                    attempt = 0;
                    subscription
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Subscribe failed");
                    if !self.wait_before_reconnect(&mut attempt, e, &mut shutdown).await? {
                        return Ok(self.close());
                    }
                    continue;
                }
            };

            self.set_state(LoopState::Subscribed);
            let exit = self.receive(subscription.as_mut(), &mut shutdown).await;
            subscription.unsubscribe().await;

            match exit {
                Exit::Shutdown => return Ok(self.close()),
                Exit::Transport(e) => {
                    tracing::warn!(error = %e, "Log subscription dropped");
                    if !self.wait_before_reconnect(&mut attempt, e, &mut shutdown).await? {
                        return Ok(self.close());
                    }
                }
            }
        }
    }

    fn close(mut self) -> LoopStats {
        self.set_state(LoopState::Closed);
        tracing::info!(
            batches = self.stats.batches,
            delivered = self.stats.delivered,
            rejected = self.stats.rejected,
            duplicates = self.stats.duplicates,
            reconnects = self.stats.reconnects,
            "Subscription loop closed"
        );
        std::mem::take(&mut self.stats)
    }

    /// Back off before the next subscribe. Returns false if shutdown arrived
    /// while waiting.
    async fn wait_before_reconnect(
        &mut self,
        attempt: &mut u32,
        err: TransportError,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<bool, LoopError> {
        *attempt += 1;
        let max = self.config.max_reconnect_attempts;
        if max > 0 && *attempt > max {
            tracing::error!(attempts = max, error = %err, "Reconnect attempts exhausted");
            self.set_state(LoopState::Closed);
            return Err(LoopError::ReconnectExhausted {
                attempts: max,
                last: err,
            });
        }

        self.set_state(LoopState::Reconnecting);
        self.stats.reconnects += 1;
        metrics::record_reconnect();

        let delay = calculate_backoff(
            *attempt,
            self.config.reconnect_base_ms,
            self.config.reconnect_max_ms,
        );
        tracing::info!(attempt = *attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

        tokio::select! {
            biased;
            _ = shutdown.recv() => Ok(false),
            _ = tokio::time::sleep(delay) => Ok(true),
        }
    }

    async fn receive(
        &mut self,
        subscription: &mut dyn LogSubscription,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Exit {
        self.set_state(LoopState::Receiving);
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => None,
                res = subscription.recv() => Some(res),
            };
            match next {
                None => return Exit::Shutdown,
                Some(Err(e)) => return Exit::Transport(e),
                Some(Ok(batch)) => self.handle_batch(batch).await,
            }
        }
    }

    async fn handle_batch(&mut self, batch: RawLogBatch) {
        self.stats.batches += 1;

        let event = match self.processor.process(&batch) {
            Ok(event) => event,
            Err(rejection) => {
                self.stats.rejected += 1;
                report_rejection(&batch, &rejection);
                return;
            }
        };

        let id = batch.transaction_id.as_str();
        let _gate = self.dedup.lock().await;
        if !self.dedup.should_process(id) {
            self.stats.duplicates += 1;
            metrics::record_batch("duplicate");
            tracing::debug!(signature = %id, "Shield event already delivered, skipping");
            return;
        }

        match self.sink.deliver(id, &event).await {
            Ok(()) => {
                if let Err(e) = self.dedup.mark_processed(id) {
                    tracing::error!(signature = %id, error = %e, "Delivered but could not record as processed");
                }
                self.stats.delivered += 1;
                metrics::record_batch("delivered");
                tracing::info!(
                    signature = %id,
                    slot = batch.slot,
                    destination = %event.destination_address(),
                    amount = %event.amount().raw,
                    "Shield event delivered"
                );
            }
            Err(e) => {
                self.stats.sink_failures += 1;
                metrics::record_batch("sink_error");
                tracing::warn!(signature = %id, error = %e, "Sink refused shield event; left unmarked");
            }
        }
    }
}
