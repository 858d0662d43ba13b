//! Queue-manager connection lifecycle.
//!
//! [`ConnectionManager`] owns the connection parameters and at most one live
//! connection. Initialization probes the queue manager once and keeps the
//! probe connection; afterwards [`ConnectionManager::acquire`] hands out the
//! cached connection, reconnecting lazily after a [`release`].
//!
//! All reads and writes of the cached state happen under one async mutex that
//! is held across the connect call, so concurrent acquirers never race to
//! create two connections.
//!
//! [`release`]: ConnectionManager::release

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::Mutex;
use tracing::{Instrument, warn};

use crate::{
    config::ConnectionParams,
    error::{BridgeError, Result},
    metrics,
    tracing_config::TracingConfig,
    tracing_helpers::{connect_span, disconnect_span, emit_timing_event, start_timer},
    transport::{
        Connection,
        ConnectRequest,
        MQCC_OK,
        PropertySet,
        QueueObject,
        Transport,
        TransportError,
    },
};

struct State<C> {
    params: Option<ConnectionParams>,
    request: Option<ConnectRequest>,
    handle: Option<Arc<C>>,
    /// Most recent failed lazy connect, tagged with the completed-attempt
    /// count it produced.
    failed: Option<(u64, TransportError)>,
}

impl<C> Default for State<C> {
    fn default() -> Self {
        Self {
            params: None,
            request: None,
            handle: None,
            failed: None,
        }
    }
}

/// Owns the connection to one queue manager.
///
/// The manager is `Send + Sync`; share it (or the [`crate::Client`] that
/// wraps it) behind an `Arc` to use it from concurrent tasks.
pub struct ConnectionManager<T: Transport> {
    transport: T,
    state: Mutex<State<T::Connection>>,
    completed: AtomicU64,
    tracing: TracingConfig,
}

impl<T: Transport> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("completed_attempts", &self.completed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create an uninitialized manager over `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(State::default()),
            completed: AtomicU64::new(0),
            tracing: TracingConfig::default(),
        }
    }

    /// Use `config` for connect and disconnect spans.
    #[must_use]
    pub fn with_tracing_config(mut self, config: TracingConfig) -> Self {
        self.tracing = config;
        self
    }

    /// Borrow the transport.
    #[must_use]
    pub const fn transport(&self) -> &T { &self.transport }

    /// Validate `params`, probe the queue manager and cache the connection.
    ///
    /// Returns the completion code of the probe, which is always
    /// [`MQCC_OK`] on success. Initializing an already initialized manager
    /// replaces its parameters and connection; the previous connection is
    /// disconnected and a failure to do so is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] if a required parameter is
    /// missing (no connect is attempted) and [`BridgeError::Connection`] if
    /// the probe fails. A failed initialize leaves the manager unchanged.
    pub async fn initialize(&self, params: ConnectionParams) -> Result<i32> {
        params.validate()?;
        let request = params.connect_request();

        let mut state = self.state.lock().await;
        let connection = self
            .connect(params.queue_manager(), &request)
            .await
            .inspect_err(|_| metrics::inc_errors())?;
        let previous = state.handle.replace(Arc::new(connection));
        state.params = Some(params);
        state.request = Some(request);
        state.failed = None;
        drop(state);

        if let Some(previous) = previous {
            metrics::dec_connections();
            if let Err(error) = previous.disconnect().await {
                warn!(%error, "failed to disconnect replaced connection");
            }
        }
        Ok(MQCC_OK)
    }

    /// Return the cached connection, connecting first if there is none.
    ///
    /// Callers that arrive while another caller's connect is in progress
    /// wait for it and share its outcome: the same connection, or the same
    /// error without a second connect.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotInitialized`] before a successful
    /// [`initialize`](Self::initialize), without touching the transport, and
    /// [`BridgeError::Connection`] if connecting fails.
    pub async fn acquire(&self) -> Result<Arc<T::Connection>> {
        // Attempts finished before this caller queued on the lock; a failure
        // tagged later came from a connect this caller waited behind.
        let observed = self.completed.load(Ordering::Acquire);
        let mut state = self.state.lock().await;
        if let Some(handle) = &state.handle {
            return Ok(Arc::clone(handle));
        }
        let (Some(params), Some(request)) = (state.params.as_ref(), state.request.clone()) else {
            return Err(BridgeError::NotInitialized);
        };
        let queue_manager = params.queue_manager().to_owned();
        if let Some((attempt, source)) = &state.failed
            && *attempt > observed
        {
            return Err(BridgeError::Connection {
                queue_manager,
                source: source.clone(),
            });
        }

        let outcome = self.connect(&queue_manager, &request).await;
        let attempt = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        match outcome {
            Ok(connection) => {
                let handle = Arc::new(connection);
                state.handle = Some(Arc::clone(&handle));
                state.failed = None;
                Ok(handle)
            }
            Err(error) => {
                if let BridgeError::Connection { source, .. } = &error {
                    state.failed = Some((attempt, source.clone()));
                }
                Err(error)
            }
        }
    }

    /// Disconnect and forget the cached connection.
    ///
    /// Calling this with nothing cached succeeds without doing anything.
    /// The cache is cleared even when the disconnect fails; the failure is
    /// returned and not retried.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connection`] if the transport reports a
    /// disconnect failure.
    pub async fn release(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(handle) = state.handle.take() else {
            return Ok(());
        };
        let queue_manager = state
            .params
            .as_ref()
            .map(|p| p.queue_manager().to_owned())
            .unwrap_or_default();

        let span = disconnect_span(&self.tracing, &queue_manager);
        let start = start_timer(self.tracing.disconnect_timing);
        let result = async {
            metrics::dec_connections();
            let result = handle.disconnect().await;
            emit_timing_event(start);
            result
        }
        .instrument(span)
        .await;
        drop(state);

        result.map_err(|source| {
            metrics::inc_errors();
            BridgeError::Connection {
                queue_manager,
                source,
            }
        })
    }

    /// Returns `true` if a connection is cached.
    pub async fn is_connected(&self) -> bool { self.state.lock().await.handle.is_some() }

    /// Parameters stored by the last successful initialize.
    pub async fn params(&self) -> Option<ConnectionParams> { self.state.lock().await.params.clone() }

    async fn connect(&self, queue_manager: &str, request: &ConnectRequest) -> Result<T::Connection> {
        let span = connect_span(&self.tracing, queue_manager, &request.connection_name);
        let start = start_timer(self.tracing.connect_timing);
        async {
            let result = self.transport.connect(queue_manager, request).await;
            emit_timing_event(start);
            match result {
                Ok(connection) => {
                    metrics::inc_connections();
                    Ok(connection)
                }
                Err(source) => {
                    warn!(error = %source, "error in making the connection");
                    Err(BridgeError::Connection {
                        queue_manager: queue_manager.to_owned(),
                        source,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Close `queue` once the operation using it has produced its result.
///
/// A close failure cannot change that result, so it is logged and dropped.
pub(crate) async fn close_queue<Q: QueueObject>(queue: Q) {
    let name = queue.name().to_owned();
    if let Err(error) = queue.close().await {
        warn!(queue = %name, %error, "error in closing queue");
    }
}

/// Destroy a property set after the put it was attached to.
///
/// Like [`close_queue`], failures are logged and dropped.
pub(crate) async fn destroy_properties<P: PropertySet>(properties: P) {
    let handle = properties.handle().0;
    if let Err(error) = properties.destroy().await {
        warn!(handle, %error, "error in deleting message handle");
    }
}
