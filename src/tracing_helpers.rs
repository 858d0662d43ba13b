//! Tracing span and event helpers for bridge operations.
//!
//! These helpers centralise span creation with dynamic level selection and
//! per-operation timing, keeping the instrumentation out of the operation
//! bodies.

use std::time::Instant;

use tracing::{Level, Span};

use crate::tracing_config::TracingConfig;

/// Create a tracing span at a dynamically selected level.
///
/// Each arm calls the matching `tracing::<level>_span!` macro so the span
/// metadata is static per arm while the arm is chosen at runtime.
macro_rules! dynamic_span {
    ($level:expr, $name:expr $(, $($field:tt)*)?) => {
        match $level {
            Level::ERROR => tracing::error_span!($name $(, $($field)*)?),
            Level::WARN  => tracing::warn_span!($name $(, $($field)*)?),
            Level::INFO  => tracing::info_span!($name $(, $($field)*)?),
            Level::DEBUG => tracing::debug_span!($name $(, $($field)*)?),
            Level::TRACE => tracing::trace_span!($name $(, $($field)*)?),
        }
    };
}

/// Span for connection establishment.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn connect_span(config: &TracingConfig, queue_manager: &str, connection: &str) -> Span {
    dynamic_span!(
        config.connect_level,
        "mq.connect",
        queue_manager = queue_manager,
        connection = connection
    )
}

/// Span for a send; `message_id` is recorded once the put succeeds.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn send_span(config: &TracingConfig, queue: &str, reply_to: &str) -> Span {
    dynamic_span!(
        config.send_level,
        "mq.send",
        queue = queue,
        reply_to = reply_to,
        message_id = tracing::field::Empty
    )
}

/// Span for a receive; `result` is recorded when the get returns.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn receive_span(config: &TracingConfig, queue: &str, correlation_id: &str) -> Span {
    dynamic_span!(
        config.receive_level,
        "mq.receive",
        queue = queue,
        correlation_id = correlation_id,
        result = tracing::field::Empty
    )
}

/// Span for reply simulation; `result` is recorded on completion.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn simulate_span(config: &TracingConfig, queue: &str) -> Span {
    dynamic_span!(
        config.simulate_level,
        "mq.simulate",
        queue = queue,
        result = tracing::field::Empty
    )
}

/// Span for disconnect.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn disconnect_span(config: &TracingConfig, queue_manager: &str) -> Span {
    dynamic_span!(
        config.disconnect_level,
        "mq.disconnect",
        queue_manager = queue_manager
    )
}

/// Start a timer when timing is enabled.
pub(crate) fn start_timer(enabled: bool) -> Option<Instant> { enabled.then(Instant::now) }

/// Record elapsed time if timing was enabled for this operation.
///
/// Must be called inside the operation's span so the event is attributed
/// to it.
pub(crate) fn emit_timing_event(start: Option<Instant>) {
    if let Some(start) = start {
        let elapsed_us = start.elapsed().as_micros();
        tracing::debug!(elapsed_us = elapsed_us, "operation.timing");
    }
}
