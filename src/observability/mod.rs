//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay / chain subsystems produce:
//!     → logging.rs (tracing events with structured fields)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! Trust violations are logged at `error` with `alert = "trust_violation"` so
//! they can be routed separately from routine rejections.

pub mod logging;
pub mod metrics;
