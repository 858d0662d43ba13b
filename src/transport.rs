//! Capability interface to the queue-manager client binding.
//!
//! The bridge never talks to a broker directly. It drives an implementation
//! of [`Transport`], which connects to a queue manager and hands back a
//! [`Connection`]. Queues opened on a connection are [`QueueObject`]s and
//! message properties are staged on a [`PropertySet`] before a put.
//!
//! The descriptor and option types mirror the queue manager's own structures
//! closely enough that a native binding can translate them field by field.
//! [`memory::MemoryBroker`] implements the traits in process.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    ids::{CorrelationId, MessageId},
    message::PropertyValue,
};

pub mod memory;

/// Completion code reported when a call succeeded.
pub const MQCC_OK: i32 = 0;
/// Completion code reported when a call partially succeeded.
pub const MQCC_WARNING: i32 = 1;
/// Completion code reported when a call failed.
pub const MQCC_FAILED: i32 = 2;

/// The connection to the queue manager was lost.
pub const MQRC_CONNECTION_BROKEN: i32 = 2009;
/// No message matched the get request within the wait interval.
pub const MQRC_NO_MSG_AVAILABLE: i32 = 2033;
/// The user is not authorized for the operation.
pub const MQRC_NOT_AUTHORIZED: i32 = 2035;
/// The queue was not opened for input.
pub const MQRC_NOT_OPEN_FOR_INPUT: i32 = 2037;
/// The queue was not opened for output.
pub const MQRC_NOT_OPEN_FOR_OUTPUT: i32 = 2039;
/// The queue manager name is unknown.
pub const MQRC_Q_MGR_NAME_ERROR: i32 = 2058;
/// The queue name is unknown.
pub const MQRC_UNKNOWN_OBJECT_NAME: i32 = 2085;
/// The queue manager is shutting down.
pub const MQRC_Q_MGR_QUIESCING: i32 = 2161;
/// The property name is not valid.
pub const MQRC_PROPERTY_NAME_ERROR: i32 = 2442;
/// The message handle is not valid.
pub const MQRC_HMSG_ERROR: i32 = 2460;
/// The host could not be reached.
pub const MQRC_HOST_NOT_AVAILABLE: i32 = 2538;

/// Symbolic name for a known reason code.
#[must_use]
pub const fn reason_name(reason: i32) -> &'static str {
    match reason {
        MQRC_CONNECTION_BROKEN => "MQRC_CONNECTION_BROKEN",
        MQRC_NO_MSG_AVAILABLE => "MQRC_NO_MSG_AVAILABLE",
        MQRC_NOT_AUTHORIZED => "MQRC_NOT_AUTHORIZED",
        MQRC_NOT_OPEN_FOR_INPUT => "MQRC_NOT_OPEN_FOR_INPUT",
        MQRC_NOT_OPEN_FOR_OUTPUT => "MQRC_NOT_OPEN_FOR_OUTPUT",
        MQRC_Q_MGR_NAME_ERROR => "MQRC_Q_MGR_NAME_ERROR",
        MQRC_UNKNOWN_OBJECT_NAME => "MQRC_UNKNOWN_OBJECT_NAME",
        MQRC_Q_MGR_QUIESCING => "MQRC_Q_MGR_QUIESCING",
        MQRC_PROPERTY_NAME_ERROR => "MQRC_PROPERTY_NAME_ERROR",
        MQRC_HMSG_ERROR => "MQRC_HMSG_ERROR",
        MQRC_HOST_NOT_AVAILABLE => "MQRC_HOST_NOT_AVAILABLE",
        _ => "MQRC_UNKNOWN",
    }
}

/// Transport call that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// Connect to a queue manager.
    Connect,
    /// Disconnect from a queue manager.
    Disconnect,
    /// Open a queue.
    Open,
    /// Close a queue.
    Close,
    /// Put a message.
    Put,
    /// Get a message.
    Get,
    /// Create a message handle.
    CreateMessageHandle,
    /// Set a message property.
    SetMessageProperty,
    /// Delete a message handle.
    DeleteMessageHandle,
}

impl Verb {
    /// Name of the call as the queue manager knows it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "MQCONNX",
            Self::Disconnect => "MQDISC",
            Self::Open => "MQOPEN",
            Self::Close => "MQCLOSE",
            Self::Put => "MQPUT",
            Self::Get => "MQGET",
            Self::CreateMessageHandle => "MQCRTMH",
            Self::SetMessageProperty => "MQSETMP",
            Self::DeleteMessageHandle => "MQDLTMH",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Error reported by the transport binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// Call that failed.
    pub verb: Verb,
    /// Completion code, [`MQCC_WARNING`] or [`MQCC_FAILED`].
    pub completion_code: i32,
    /// Reason code explaining the failure.
    pub reason_code: i32,
}

impl TransportError {
    /// A failed call with the given reason.
    #[must_use]
    pub const fn failed(verb: Verb, reason_code: i32) -> Self {
        Self {
            verb,
            completion_code: MQCC_FAILED,
            reason_code,
        }
    }

    /// Returns `true` when the error means "no message available".
    #[must_use]
    pub const fn is_no_message(&self) -> bool { self.reason_code == MQRC_NO_MSG_AVAILABLE }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: MQCC = {} MQRC = {} [{}]",
            self.verb,
            self.completion_code,
            reason_name(self.reason_code),
            self.reason_code
        )
    }
}

impl std::error::Error for TransportError {}

/// Result alias for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// User id and password authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User id presented to the queue manager.
    pub user_id: String,
    /// Password for `user_id`.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS settings for the client channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsSettings {
    /// Location of the key repository.
    pub key_repository: String,
    /// Cipher specification negotiated on the channel.
    pub cipher_spec: String,
}

/// Everything a transport needs to connect as a client.
#[expect(
    clippy::struct_excessive_bools,
    reason = "independent connect option flags"
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Server-connection channel name.
    pub channel: String,
    /// Connection name in `host(port)` form.
    pub connection_name: String,
    /// Application name reported to the queue manager.
    pub application_name: String,
    /// Connect with client bindings.
    pub client_binding: bool,
    /// Allow the binding to reconnect transparently.
    pub reconnect: bool,
    /// Share the handle between threads without blocking.
    pub share_handle_no_block: bool,
    /// Let all conversations share the channel instance.
    pub all_conversations_share: bool,
    /// Credentials, when a user id is configured.
    pub credentials: Option<Credentials>,
    /// TLS settings, when a key repository is configured.
    pub tls: Option<TlsSettings>,
}

/// Format marker carried in the message descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Character data (`MQSTR`).
    #[default]
    String,
    /// Application-defined bytes (blank format).
    None,
}

impl MessageFormat {
    /// The eight-character format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "MQSTR   ",
            Self::None => "        ",
        }
    }
}

/// Message descriptor exchanged with the transport on put and get.
///
/// On put the transport writes the assigned message id back into the
/// descriptor. On get the selection fields are read and then the whole
/// descriptor is overwritten with that of the retrieved message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Message identifier.
    pub message_id: MessageId,
    /// Correlation identifier.
    pub correlation_id: CorrelationId,
    /// Reply-to queue; empty means no reply requested.
    pub reply_to_queue: String,
    /// Format of the message body.
    pub format: MessageFormat,
}

/// Options for opening a queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Open for put.
    pub output: bool,
    /// Open for get, shared with other readers.
    pub input_shared: bool,
    /// Open for get with the queue's default sharing.
    pub input_as_queue_default: bool,
}

impl OpenOptions {
    /// Options used to put messages.
    #[must_use]
    pub const fn output() -> Self {
        Self {
            output: true,
            input_shared: false,
            input_as_queue_default: true,
        }
    }

    /// Options used to get messages.
    #[must_use]
    pub const fn shared_input() -> Self {
        Self {
            output: false,
            input_shared: true,
            input_as_queue_default: false,
        }
    }

    /// Returns `true` if gets are permitted.
    #[must_use]
    pub const fn allows_input(&self) -> bool { self.input_shared || self.input_as_queue_default }
}

/// Opaque handle to a [`PropertySet`] created on a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

/// Options for a put.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Put outside any unit of work.
    pub no_syncpoint: bool,
    /// Ask the queue manager to assign a fresh message id.
    pub new_message_id: bool,
    /// Fail instead of queueing when the queue manager is quiescing.
    pub fail_if_quiescing: bool,
    /// Properties to attach to the message.
    pub original_message_handle: Option<MessageHandle>,
}

impl PutOptions {
    /// Options for a request put: no sync-point, new message id, fail if
    /// quiescing.
    #[must_use]
    pub const fn request() -> Self {
        Self {
            no_syncpoint: true,
            new_message_id: true,
            fail_if_quiescing: true,
            original_message_handle: None,
        }
    }

    /// Options for a reply put: no sync-point and a new message id.
    #[must_use]
    pub const fn reply() -> Self {
        Self {
            no_syncpoint: true,
            new_message_id: true,
            fail_if_quiescing: false,
            original_message_handle: None,
        }
    }
}

/// Options for a get.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Get outside any unit of work.
    pub no_syncpoint: bool,
    /// Wait up to this long for a message; `None` returns immediately.
    pub wait: Option<Duration>,
    /// Only accept a message whose correlation id equals the descriptor's.
    pub match_correlation_id: bool,
}

impl GetOptions {
    /// Wait up to `wait` for any message.
    #[must_use]
    pub const fn any(wait: Duration) -> Self {
        Self {
            no_syncpoint: true,
            wait: Some(wait),
            match_correlation_id: false,
        }
    }

    /// Wait up to `wait` for a message matching the descriptor's
    /// correlation id.
    #[must_use]
    pub const fn correlated(wait: Duration) -> Self {
        Self {
            no_syncpoint: true,
            wait: Some(wait),
            match_correlation_id: true,
        }
    }
}

/// Connects to a queue manager.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Live session type.
    type Connection: Connection;

    /// Connect to `queue_manager` using `request`.
    async fn connect(
        &self,
        queue_manager: &str,
        request: &ConnectRequest,
    ) -> TransportResult<Self::Connection>;
}

/// A live session with a queue manager.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Queue handle type.
    type Queue: QueueObject;
    /// Message handle type.
    type Properties: PropertySet;

    /// Open `queue` with `options`.
    async fn open(&self, queue: &str, options: OpenOptions) -> TransportResult<Self::Queue>;

    /// Create an empty message handle for staging properties.
    async fn create_property_set(&self) -> TransportResult<Self::Properties>;

    /// End the session.
    async fn disconnect(&self) -> TransportResult<()>;
}

/// A queue opened on a connection.
#[async_trait]
pub trait QueueObject: Send {
    /// Name the queue was opened under.
    fn name(&self) -> &str;

    /// Put `payload` described by `descriptor`.
    async fn put(
        &mut self,
        descriptor: &mut MessageDescriptor,
        options: &PutOptions,
        payload: &[u8],
    ) -> TransportResult<()>;

    /// Get a message selected by `descriptor` and `options`.
    ///
    /// Returns `Ok(None)` when no message became available within the wait
    /// interval.
    async fn get(
        &mut self,
        descriptor: &mut MessageDescriptor,
        options: &GetOptions,
    ) -> TransportResult<Option<Bytes>>;

    /// Close the queue handle.
    async fn close(self) -> TransportResult<()>;
}

/// Message properties staged for a put.
#[async_trait]
pub trait PropertySet: Send + Sync {
    /// Handle passed in [`PutOptions::original_message_handle`].
    fn handle(&self) -> MessageHandle;

    /// Set property `name` to `value`.
    async fn set(&mut self, name: &str, value: &PropertyValue) -> TransportResult<()>;

    /// Release the handle.
    async fn destroy(self) -> TransportResult<()>;
}
