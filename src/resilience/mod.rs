//! Resilience helpers.
//!
//! The relay has one long-lived external dependency, the log subscription.
//! When it drops, the loop waits `calculate_backoff(attempt, ..)` before
//! subscribing again; the attempt counter resets after a successful subscribe.

pub mod backoff;
