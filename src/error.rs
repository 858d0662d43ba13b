//! Canonical error and result types for the crate.
//!
//! Every failure a bridge operation can report is a [`BridgeError`]. Variants
//! that come from the transport keep the [`TransportError`] as their source
//! and add the operation and queue it happened on. "No message available" is
//! never an error; it is [`crate::ReceiveOutcome::NotYetAvailable`] or
//! [`crate::SimulationOutcome::NoMessageFound`].

use std::fmt;

use crate::{ids::IdParseError, transport::TransportError};

/// Invalid connection parameters.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter is absent or empty.
    #[error("missing required connection parameter `{0}`")]
    Missing(&'static str),
    /// A parameter could not be parsed.
    #[error("invalid value {value:?} for connection parameter `{field}`")]
    Invalid {
        /// Parameter name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Step of the reply simulation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationStage {
    /// Opening the queue the request was sent to.
    OpenSource,
    /// Getting the request.
    Get,
    /// Opening the request's reply-to queue.
    OpenReply,
    /// Putting the reply.
    Put,
}

impl fmt::Display for SimulationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenSource => "opening queue",
            Self::Get => "getting message",
            Self::OpenReply => "opening reply queue",
            Self::Put => "putting reply",
        })
    }
}

/// Errors emitted by bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Connection parameters are incomplete or malformed.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Connecting to or disconnecting from the queue manager failed.
    #[error("error connecting to queue manager {queue_manager}: {source}")]
    Connection {
        /// Queue manager name.
        queue_manager: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// A connection was requested before a successful initialize.
    #[error("connection manager has not been initialized")]
    NotInitialized,
    /// A queue could not be opened.
    #[error("error in opening queue {queue}: {source}")]
    QueueOpen {
        /// Queue name.
        queue: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The put failed.
    #[error("error in putting msg to {queue}: {source}")]
    Put {
        /// Queue name.
        queue: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// A get failed for a reason other than "no message available".
    #[error("error getting message from {queue}: {source}")]
    Receive {
        /// Queue name.
        queue: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The reply simulator failed after consuming or while seeking a request.
    #[error("(SIM) error {stage} {queue}: {source}")]
    Simulation {
        /// Step that failed.
        stage: SimulationStage,
        /// Queue the step operated on.
        queue: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Creating the message handle for properties failed.
    #[error("error in creating message handle: {source}")]
    PropertyHandle {
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Setting a message property failed.
    #[error("error in setting prop {key}: {source}")]
    PropertySet {
        /// Property that was rejected.
        key: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// A correlation identifier was not valid hex.
    #[error("invalid correlation id {value:?}: {source}")]
    InvalidCorrelationId {
        /// Rejected input.
        value: String,
        /// Parse failure.
        #[source]
        source: IdParseError,
    },
    /// A payload value was neither text nor bytes.
    #[error("unsupported payload type: {kind}")]
    UnsupportedPayload {
        /// Shape of the rejected value.
        kind: &'static str,
    },
    /// A property value cannot be carried as a message property.
    #[error("unsupported value for property {key}: {kind}")]
    UnsupportedProperty {
        /// Property name.
        key: String,
        /// Shape of the rejected value.
        kind: &'static str,
    },
}

impl BridgeError {
    /// Status code reported to host engines.
    ///
    /// Connection failures report the transport's completion code; every
    /// other failure reports `1`.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::Connection { source, .. } => source.completion_code,
            _ => 1,
        }
    }

    /// The transport failure behind this error, if any.
    #[must_use]
    pub const fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Connection { source, .. }
            | Self::QueueOpen { source, .. }
            | Self::Put { source, .. }
            | Self::Receive { source, .. }
            | Self::Simulation { source, .. }
            | Self::PropertyHandle { source }
            | Self::PropertySet { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Canonical result alias used by bridge APIs.
pub type Result<T> = std::result::Result<T, BridgeError>;
