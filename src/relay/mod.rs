//! Shield event relay.
//!
//! # Data Flow
//! ```text
//! cluster (logsSubscribe, finalized, mentions = program)
//!     → source.rs (LogSource / LogSubscription, one RawLogBatch per tx)
//!     → subscription.rs (SubscriptionLoop: state machine, reconnect, shutdown)
//!     → validator.rs (structural checks: chain failure, line count, tag)
//!     → codec.rs (payload → ShieldEvent, trusted proxy check)
//!     → dedup.rs (skip signatures already delivered)
//!     → sink.rs (ShieldSink::deliver, then mark processed)
//! ```
//!
//! Every rejected batch is logged and counted; none of them stop the loop.
//! A signature is marked processed only after the sink acknowledges it, so a
//! crash between delivery and marking can redeliver (at-least-once).

pub mod codec;
pub mod dedup;
pub mod processor;
pub mod sink;
pub mod source;
pub mod subscription;
pub mod types;
pub mod validator;

pub use codec::EventCodec;
pub use dedup::{DedupError, DedupStore, DedupTracker, FileDedupStore, MemoryDedupStore};
pub use processor::ShieldProcessor;
pub use sink::{ChannelSink, LogSink, ShieldSink};
pub use source::{LogSource, LogSubscription, WsLogSource};
pub use subscription::{LoopConfig, LoopError, LoopState, LoopStats, SubscriptionLoop};
pub use types::{Amount, RawLogBatch, Rejection, ShieldEvent, SinkError, TransportError};
pub use validator::LogValidator;
