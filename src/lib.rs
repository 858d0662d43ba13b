#![doc(html_root_url = "https://docs.rs/mqbridge/latest")]
//! Public API for the `mqbridge` library.
//!
//! This crate bridges request/reply exchanges over a point-to-point message
//! queueing transport: it connects to a queue manager, puts requests with a
//! reply-to queue, retrieves the reply by correlation id, and can stand in
//! for the remote consumer while testing.
//!
//! The queue-manager binding itself sits behind the [`transport::Transport`]
//! traits. [`transport::memory::MemoryBroker`] implements them in process.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod ids;
pub mod message;
pub mod metrics;
pub mod prelude;
pub mod simulator;
pub mod tracing_config;
mod tracing_helpers;
pub mod transport;

pub use client::{Client, ClientErrorHandler};
pub use config::ConnectionParams;
pub use connection::ConnectionManager;
pub use error::{BridgeError, ConfigError, Result, SimulationStage};
pub use ids::{CorrelationId, IdParseError, MessageId};
pub use message::{
    InboundMessage,
    OutboundMessage,
    Payload,
    Properties,
    PropertyValue,
    ReceiveOutcome,
};
pub use metrics::{
    CONNECTIONS_ACTIVE,
    Direction,
    ERRORS_TOTAL,
    MESSAGES_TOTAL,
    RECEIVE_NOT_AVAILABLE,
};
pub use simulator::{ReplySimulator, SIMULATED_REPLY, SimulationOutcome};
pub use tracing_config::TracingConfig;
pub use transport::{TransportError, Verb};
