//! Request sends.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{Instrument, Span, debug};

use super::Client;
use crate::{
    connection::{close_queue, destroy_properties},
    error::{BridgeError, Result},
    ids::MessageId,
    message::{OutboundMessage, Payload, Properties, PropertyValue},
    metrics::{self, Direction},
    tracing_helpers::{emit_timing_event, send_span, start_timer},
    transport::{Connection, OpenOptions, PropertySet, PutOptions, QueueObject, Transport},
};

impl<T: Transport> Client<T> {
    /// Put `payload` on `queue`, requesting replies on `reply_to`.
    ///
    /// Text payloads are put with the string format marker and binary
    /// payloads without one. Each entry of `properties` is set on a message
    /// handle attached to the put. When `simulate_reply` is set the reply
    /// simulator answers the request before this call returns.
    ///
    /// Returns the message id assigned by the queue manager; a reply
    /// correlates to it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::QueueOpen`], [`BridgeError::PropertyHandle`],
    /// [`BridgeError::PropertySet`] or [`BridgeError::Put`] when the
    /// corresponding transport call fails, and any connection error from
    /// acquiring the connection. With `simulate_reply`, a simulator failure
    /// is returned even though the request was put.
    pub async fn send(
        &self,
        queue: &str,
        reply_to: &str,
        payload: impl Into<Payload>,
        properties: &Properties,
        simulate_reply: bool,
    ) -> Result<MessageId> {
        let message =
            OutboundMessage::new(queue, reply_to, payload).with_properties(properties.clone());
        self.send_message(&message, simulate_reply).await
    }

    /// [`send`](Self::send) with dynamically typed payload and properties.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedPayload`] or
    /// [`BridgeError::UnsupportedProperty`] before any transport call when a
    /// value cannot be carried, otherwise as [`send`](Self::send).
    pub async fn send_value(
        &self,
        queue: &str,
        reply_to: &str,
        payload: Value,
        properties: HashMap<String, Value>,
        simulate_reply: bool,
    ) -> Result<MessageId> {
        let converted = Payload::from_value(payload)
            .and_then(|payload| Ok((payload, PropertyValue::from_values(properties)?)));
        let (payload, properties) = match converted {
            Ok(parts) => parts,
            Err(error) => {
                self.invoke_error_hook(&error).await;
                return Err(error);
            }
        };
        let message = OutboundMessage::new(queue, reply_to, payload).with_properties(properties);
        self.send_message(&message, simulate_reply).await
    }

    /// Put a fully described message.
    ///
    /// An explicit correlation id on `message` is carried in the
    /// descriptor.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_message(
        &self,
        message: &OutboundMessage,
        simulate_reply: bool,
    ) -> Result<MessageId> {
        let span = send_span(&self.tracing, &message.queue, &message.reply_to);
        let start = start_timer(self.tracing.send_timing);
        let result = async {
            let outcome = self.put_and_simulate(message, simulate_reply).await;
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

    async fn put_and_simulate(
        &self,
        message: &OutboundMessage,
        simulate_reply: bool,
    ) -> Result<MessageId> {
        let message_id = self.put(message).await?;
        Span::current().record("message_id", tracing::field::display(message_id));
        metrics::inc_messages(Direction::Put);
        debug!(queue = %message.queue, %message_id, "message put");

        if simulate_reply {
            self.simulator().simulate_traced(&message.queue).await?;
        }
        Ok(message_id)
    }

    async fn put(&self, message: &OutboundMessage) -> Result<MessageId> {
        let connection = self.connections.acquire().await?;
        let mut queue = connection
            .open(&message.queue, OpenOptions::output())
            .await
            .map_err(|source| BridgeError::QueueOpen {
                queue: message.queue.clone(),
                source,
            })?;
        let result = put_on(connection.as_ref(), &mut queue, message).await;
        close_queue(queue).await;
        result
    }
}

async fn put_on<C: Connection>(
    connection: &C,
    queue: &mut C::Queue,
    message: &OutboundMessage,
) -> Result<MessageId> {
    let mut descriptor = message.descriptor();
    let options = PutOptions::request();
    let put_error = |source| BridgeError::Put {
        queue: message.queue.clone(),
        source,
    };

    if message.properties.is_empty() {
        queue
            .put(&mut descriptor, &options, message.payload.as_bytes())
            .await
            .map_err(put_error)?;
        return Ok(descriptor.message_id);
    }

    let mut properties = connection
        .create_property_set()
        .await
        .map_err(|source| BridgeError::PropertyHandle { source })?;
    let result = async {
        for (key, value) in &message.properties {
            properties
                .set(key, value)
                .await
                .map_err(|source| BridgeError::PropertySet {
                    key: key.clone(),
                    source,
                })?;
        }
        let options = PutOptions {
            original_message_handle: Some(properties.handle()),
            ..options
        };
        queue
            .put(&mut descriptor, &options, message.payload.as_bytes())
            .await
            .map_err(put_error)
    }
    .await;
    destroy_properties(properties).await;
    result.map(|()| descriptor.message_id)
}
