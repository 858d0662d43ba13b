//! Host-facing request/reply client.
//!
//! [`Client`] is the surface test-execution engines drive: create it with
//! [`Client::new_client`], then [`send`](Client::send) requests,
//! [`receive`](Client::receive) correlated replies and finally
//! [`disconnect`](Client::disconnect). One client may be shared across tasks
//! behind an `Arc`; every operation borrows it immutably.

use std::{future::Future, sync::Arc, time::Duration};

mod hooks;
mod receive;
mod send;

pub use hooks::{BoxFuture, ClientErrorHandler};

use crate::{
    config::ConnectionParams,
    connection::ConnectionManager,
    error::{BridgeError, Result},
    simulator::{DEFAULT_SIMULATION_WAIT, ReplySimulator},
    tracing_config::TracingConfig,
    transport::Transport,
};

/// Request/reply client over one queue-manager connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use mqbridge::{Client, ConnectionParams, transport::memory::MemoryBroker};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> mqbridge::Result<()> {
/// let broker = MemoryBroker::new("QM1")
///     .with_queue("DEV.QUEUE.1")
///     .with_queue("DEV.QUEUE.2");
/// let params = ConnectionParams::new("QM1", "localhost", 1414, "DEV.APP.SVRCONN");
/// let (client, status) = Client::new_client(broker, params).await?;
/// assert_eq!(status, 0);
///
/// let id = client
///     .send("DEV.QUEUE.1", "DEV.QUEUE.2", "hello", &Default::default(), true)
///     .await?;
/// let reply = client
///     .receive("DEV.QUEUE.2", &id.to_hex(), Duration::from_secs(5))
///     .await?;
/// assert_eq!(reply.into_payload(), "Reply Message");
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport> {
    connections: ConnectionManager<T>,
    tracing: TracingConfig,
    simulator_wait: Duration,
    on_error: Option<ClientErrorHandler>,
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connections", &self.connections)
            .field("tracing", &self.tracing)
            .field("simulator_wait", &self.simulator_wait)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<T: Transport> Client<T> {
    /// Create an uninitialized client over `transport`.
    ///
    /// Call [`initialize`](Self::initialize) before sending or receiving.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            connections: ConnectionManager::new(transport),
            tracing: TracingConfig::default(),
            simulator_wait: DEFAULT_SIMULATION_WAIT,
            on_error: None,
        }
    }

    /// Create a client and initialize it with `params`.
    ///
    /// Returns the client together with the completion code of the
    /// connection probe.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ConnectionManager::initialize`]; its
    /// [`BridgeError::status_code`] is the status reported to host engines.
    pub async fn new_client(transport: T, params: ConnectionParams) -> Result<(Self, i32)> {
        let client = Self::new(transport);
        let status = client.initialize(params).await?;
        Ok((client, status))
    }

    /// Configure tracing for every operation of this client.
    #[must_use]
    pub fn with_tracing_config(mut self, config: TracingConfig) -> Self {
        self.connections = self.connections.with_tracing_config(config.clone());
        self.tracing = config;
        self
    }

    /// How long the reply simulator waits for the request it answers.
    #[must_use]
    pub const fn with_simulator_wait(mut self, wait: Duration) -> Self {
        self.simulator_wait = wait;
        self
    }

    /// Register a callback invoked when an operation fails.
    ///
    /// The handler runs before the error is returned to the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use mqbridge::{Client, transport::memory::MemoryBroker};
    ///
    /// let client = Client::new(MemoryBroker::new("QM1")).on_error(|err| {
    ///     let message = err.to_string();
    ///     async move {
    ///         eprintln!("bridge error: {message}");
    ///     }
    /// });
    /// let _ = client;
    /// ```
    #[must_use]
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a BridgeError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(Arc::new(move |e| Box::pin(f(e))));
        self
    }

    /// Validate `params` and probe the queue manager.
    ///
    /// # Errors
    ///
    /// See [`ConnectionManager::initialize`].
    pub async fn initialize(&self, params: ConnectionParams) -> Result<i32> {
        self.connections.initialize(params).await
    }

    /// Borrow the connection manager.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionManager<T> { &self.connections }

    /// Tear down the cached connection.
    ///
    /// Calling this more than once, or before any connection exists,
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connection`] if the transport fails to
    /// disconnect; the connection is forgotten regardless.
    pub async fn disconnect(&self) -> Result<()> {
        let result = self.connections.release().await;
        if let Err(error) = &result {
            self.invoke_error_hook(error).await;
        }
        result
    }

    pub(crate) fn simulator(&self) -> ReplySimulator<'_, T> {
        ReplySimulator::new(&self.connections)
            .with_wait(self.simulator_wait)
            .with_tracing_config(self.tracing.clone())
    }

    /// Invoke the error hook if one is registered.
    pub(crate) async fn invoke_error_hook(&self, error: &BridgeError) {
        if let Some(ref handler) = self.on_error {
            handler(error).await;
        }
    }
}

#[cfg(test)]
mod tests;
