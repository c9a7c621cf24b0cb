//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → RelayConfig (validated, immutable)
//!     → handed to each subsystem at construction
//! ```
//!
//! Config is loaded once at startup. There is no hot reload: the trusted
//! proxy and program id must not change under a running loop.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BridgeConfig, ChainConfig, DedupConfig, ObservabilityConfig, RelayConfig, SubscriptionConfig,
};
