//! Correlated reply retrieval.

use std::time::Duration;

use tracing::{Instrument, Span, debug};

use super::Client;
use crate::{
    connection::close_queue,
    error::{BridgeError, Result},
    ids::CorrelationId,
    message::{InboundMessage, ReceiveOutcome},
    metrics::{self, Direction},
    tracing_helpers::{emit_timing_event, receive_span, start_timer},
    transport::{
        Connection,
        GetOptions,
        MQRC_NO_MSG_AVAILABLE,
        MessageDescriptor,
        OpenOptions,
        QueueObject,
        Transport,
        TransportError,
    },
};

impl<T: Transport> Client<T> {
    /// Wait up to `wait` for a message on `queue` whose correlation id is
    /// `correlation_id`, given in hex.
    ///
    /// A message that does not arrive in time is
    /// [`ReceiveOutcome::NotYetAvailable`], not an error. Messages with other
    /// correlation ids are left on the queue.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidCorrelationId`] for malformed hex before
    /// touching the transport, [`BridgeError::QueueOpen`] or
    /// [`BridgeError::Receive`] when the corresponding transport call fails,
    /// and any connection error from acquiring the connection.
    pub async fn receive(
        &self,
        queue: &str,
        correlation_id: &str,
        wait: Duration,
    ) -> Result<ReceiveOutcome> {
        let span = receive_span(&self.tracing, queue, correlation_id);
        let start = start_timer(self.tracing.receive_timing);
        let result = async {
            let outcome = self.get_correlated(queue, correlation_id, wait).await;
            let label = match &outcome {
                Ok(ReceiveOutcome::Matched(_)) => "matched",
                Ok(ReceiveOutcome::NotYetAvailable) => "not_yet_available",
                Err(_) => "error",
            };
            Span::current().record("result", label);
            emit_timing_event(start);
            outcome
        }
        .instrument(span)
        .await;
        if let Err(error) = &result {
            metrics::inc_errors();
            self.invoke_error_hook(error).await;
        }
        result
    }

    /// [`receive`](Self::receive) with the wait given in milliseconds.
    ///
    /// Negative waits do not wait at all.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    pub async fn receive_millis(
        &self,
        queue: &str,
        correlation_id: &str,
        wait_millis: i32,
    ) -> Result<ReceiveOutcome> {
        let wait = u64::try_from(wait_millis).map_or(Duration::ZERO, Duration::from_millis);
        self.receive(queue, correlation_id, wait).await
    }

    async fn get_correlated(
        &self,
        queue: &str,
        correlation_id: &str,
        wait: Duration,
    ) -> Result<ReceiveOutcome> {
        let correlation_id = CorrelationId::parse_hex(correlation_id).map_err(|source| {
            BridgeError::InvalidCorrelationId {
                value: correlation_id.to_owned(),
                source,
            }
        })?;

        let connection = self.connections.acquire().await?;
        let mut handle = connection
            .open(queue, OpenOptions::shared_input())
            .await
            .map_err(|source| BridgeError::QueueOpen {
                queue: queue.to_owned(),
                source,
            })?;
        let mut descriptor = MessageDescriptor {
            correlation_id,
            ..MessageDescriptor::default()
        };
        let got = handle
            .get(&mut descriptor, &GetOptions::correlated(wait))
            .await;
        close_queue(handle).await;

        match got {
            Ok(Some(payload)) => {
                metrics::inc_messages(Direction::Received);
                let message = InboundMessage::from_parts(payload, descriptor);
                debug!(queue, message_id = %message.message_id, "reply matched");
                Ok(ReceiveOutcome::Matched(message))
            }
            Ok(None) | Err(TransportError { reason_code: MQRC_NO_MSG_AVAILABLE, .. }) => {
                metrics::inc_not_available();
                debug!(queue, %correlation_id, "no matching message yet");
                Ok(ReceiveOutcome::NotYetAvailable)
            }
            Err(source) => Err(BridgeError::Receive {
                queue: queue.to_owned(),
                source,
            }),
        }
    }
}
