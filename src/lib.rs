//! Solana shield bridge relay.
//!
//! Watches the bridge program's finalized logs, turns each shield
//! transaction into a `ShieldEvent` for the minting side, and builds and
//! submits shield transactions on the way in.

pub mod chain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::RelayConfig;
pub use lifecycle::Shutdown;
pub use relay::{ShieldEvent, SubscriptionLoop};
