//! Stand-in for the remote consumer of a request.
//!
//! [`ReplySimulator`] drains one message from the queue a request was sent to
//! and answers it on the request's reply-to queue, correlated to the
//! request's message id. It exists so request/reply flows can be exercised
//! without a real downstream service.

use std::time::Duration;

use tracing::{Instrument, debug};

use crate::{
    connection::{ConnectionManager, close_queue},
    error::{BridgeError, Result, SimulationStage},
    ids::{CorrelationId, MessageId},
    metrics::{self, Direction},
    tracing_config::TracingConfig,
    tracing_helpers::{emit_timing_event, simulate_span, start_timer},
    transport::{
        Connection,
        GetOptions,
        MessageDescriptor,
        MessageFormat,
        OpenOptions,
        PutOptions,
        QueueObject,
        Transport,
        TransportError,
    },
};

/// Body of every simulated reply.
pub const SIMULATED_REPLY: &str = "Reply Message";

/// How long the simulator waits for the request by default.
pub const DEFAULT_SIMULATION_WAIT: Duration = Duration::from_millis(3000);

/// Terminal state of one simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// Nothing arrived on the queue within the wait interval.
    NoMessageFound,
    /// A request was consumed and answered.
    Replied {
        /// Queue the reply was put on.
        reply_queue: String,
        /// Identifier assigned to the reply.
        reply_id: MessageId,
        /// Correlation id of the reply, equal to the request's message id.
        correlation_id: CorrelationId,
    },
}

impl SimulationOutcome {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::NoMessageFound => "no_message_found",
            Self::Replied { .. } => "replied",
        }
    }
}

/// Consumes a request and produces its canned reply.
#[derive(Debug)]
pub struct ReplySimulator<'a, T: Transport> {
    connections: &'a ConnectionManager<T>,
    wait: Duration,
    tracing: TracingConfig,
}

impl<'a, T: Transport> ReplySimulator<'a, T> {
    /// Create a simulator borrowing `connections`.
    #[must_use]
    pub fn new(connections: &'a ConnectionManager<T>) -> Self {
        Self {
            connections,
            wait: DEFAULT_SIMULATION_WAIT,
            tracing: TracingConfig::default(),
        }
    }

    /// Wait up to `wait` for the request instead of the default.
    #[must_use]
    pub const fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Use `config` for the simulation span.
    #[must_use]
    pub fn with_tracing_config(mut self, config: TracingConfig) -> Self {
        self.tracing = config;
        self
    }

    /// Take one message from `send_queue` and reply to it.
    ///
    /// # Errors
    ///
    /// Connection errors from acquiring the connection are returned as they
    /// are. Every transport failure after that is a
    /// [`BridgeError::Simulation`] naming the failing step. A request without
    /// a reply-to queue fails at [`SimulationStage::OpenReply`].
    pub async fn simulate(&self, send_queue: &str) -> Result<SimulationOutcome> {
        let result = self.simulate_traced(send_queue).await;
        if result.is_err() {
            metrics::inc_errors();
        }
        result
    }

    /// [`simulate`](Self::simulate) without counting a failure, for callers
    /// that count the failure of their enclosing operation.
    pub(crate) async fn simulate_traced(&self, send_queue: &str) -> Result<SimulationOutcome> {
        let span = simulate_span(&self.tracing, send_queue);
        let start = start_timer(self.tracing.simulate_timing);
        let result = self.run(send_queue).instrument(span.clone()).await;
        let _guard = span.enter();
        match &result {
            Ok(outcome) => {
                span.record("result", outcome.as_str());
            }
            Err(_) => {
                span.record("result", "error");
            }
        }
        emit_timing_event(start);
        result
    }

    async fn run(&self, send_queue: &str) -> Result<SimulationOutcome> {
        let connection = self.connections.acquire().await?;

        let mut source = connection
            .open(send_queue, OpenOptions::shared_input())
            .await
            .map_err(stage_error(SimulationStage::OpenSource, send_queue))?;
        let mut descriptor = MessageDescriptor::default();
        let got = match source.get(&mut descriptor, &GetOptions::any(self.wait)).await {
            Err(error) if error.is_no_message() => Ok(None),
            other => other.map_err(stage_error(SimulationStage::Get, send_queue)),
        };
        close_queue(source).await;
        if got?.is_none() {
            debug!(queue = send_queue, "no message to reply to");
            return Ok(SimulationOutcome::NoMessageFound);
        }
        metrics::inc_messages(Direction::Received);

        let reply_queue = descriptor.reply_to_queue;
        let correlation_id = CorrelationId::from(descriptor.message_id);
        let mut target = connection
            .open(&reply_queue, OpenOptions::output())
            .await
            .map_err(stage_error(SimulationStage::OpenReply, &reply_queue))?;
        let mut reply = MessageDescriptor {
            correlation_id,
            format: MessageFormat::String,
            ..MessageDescriptor::default()
        };
        let put = target
            .put(&mut reply, &PutOptions::reply(), SIMULATED_REPLY.as_bytes())
            .await
            .map_err(stage_error(SimulationStage::Put, &reply_queue));
        close_queue(target).await;
        put?;
        metrics::inc_messages(Direction::Put);

        debug!(
            queue = %reply_queue,
            message_id = %reply.message_id,
            correlation_id = %correlation_id,
            "simulated reply put"
        );
        Ok(SimulationOutcome::Replied {
            reply_queue,
            reply_id: reply.message_id,
            correlation_id,
        })
    }
}

fn stage_error(stage: SimulationStage, queue: &str) -> impl FnOnce(TransportError) -> BridgeError {
    let queue = queue.to_owned();
    move |source| BridgeError::Simulation {
        stage,
        queue,
        source,
    }
}
