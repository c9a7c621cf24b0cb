//! Downstream delivery of decoded shield events.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::relay::types::{ShieldEvent, SinkError};

/// Consumer of decoded events (the minting side).
///
/// `Ok` acknowledges the event; the relay then marks it processed.
#[async_trait]
pub trait ShieldSink: Send + Sync {
    async fn deliver(&self, signature: &str, event: &ShieldEvent) -> Result<(), SinkError>;
}

/// Writes each event to the log. Default sink for the standalone binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ShieldSink for LogSink {
    async fn deliver(&self, signature: &str, event: &ShieldEvent) -> Result<(), SinkError> {
        tracing::info!(
            signature = %signature,
            destination = %event.destination_address(),
            asset = %event.asset_id(),
            amount = %event.amount().raw,
            "Shield event"
        );
        Ok(())
    }
}

/// Hands events to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<(String, ShieldEvent)>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<(String, ShieldEvent)>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ShieldSink for ChannelSink {
    async fn deliver(&self, signature: &str, event: &ShieldEvent) -> Result<(), SinkError> {
        self.tx
            .send((signature.to_string(), event.clone()))
            .await
            .map_err(|_| SinkError::Closed)
    }
}
