//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → subscription loop leaves select!
//!               → releases the subscription → Closed
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
