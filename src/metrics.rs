//! Metric helpers for `mqbridge`.
//!
//! This module defines metric names and thin helpers wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking live queue-manager connections.
pub const CONNECTIONS_ACTIVE: &str = "mqbridge_connections_active";
/// Name of the counter tracking messages put or retrieved.
pub const MESSAGES_TOTAL: &str = "mqbridge_messages_total";
/// Name of the counter tracking receives that found no message.
pub const RECEIVE_NOT_AVAILABLE: &str = "mqbridge_receive_not_available_total";
/// Name of the counter tracking failed operations.
pub const ERRORS_TOTAL: &str = "mqbridge_errors_total";

/// Direction of message flow.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Messages put onto a queue.
    Put,
    /// Messages retrieved from a queue.
    Received,
}

impl Direction {
    #[cfg_attr(
        not(feature = "metrics"),
        expect(dead_code, reason = "only used as a metric label")
    )]
    const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Received => "received",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a message put or retrieved.
pub fn inc_messages(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a receive that timed out without a matching message.
pub fn inc_not_available() {
    #[cfg(feature = "metrics")]
    counter!(RECEIVE_NOT_AVAILABLE).increment(1);
}

/// Record a failed operation.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
