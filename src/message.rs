//! Outbound and inbound message types.
//!
//! Payloads are a tagged variant rather than an untyped value: text payloads
//! are put with the string format marker and binary payloads with the raw
//! marker. Host engines that hand over dynamic values convert them with
//! [`Payload::from_value`] and [`PropertyValue::from_value`], which reject any
//! shape the transport cannot carry.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use serde_json::Value;

use crate::{
    error::{BridgeError, Result},
    ids::{CorrelationId, MessageId},
    transport::{MessageDescriptor, MessageFormat},
};

/// Named message properties applied to an outbound message.
///
/// Keys are applied in sorted order.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Body of an outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text, put with the string format marker.
    Text(String),
    /// Opaque bytes, put without a format marker.
    Binary(Bytes),
}

impl Payload {
    /// The format marker derived from the payload variant.
    #[must_use]
    pub const fn format(&self) -> MessageFormat {
        match self {
            Self::Text(_) => MessageFormat::String,
            Self::Binary(_) => MessageFormat::None,
        }
    }

    /// Borrow the payload bytes as they will be put.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Convert a dynamic host value into a payload.
    ///
    /// Strings become [`Payload::Text`]; arrays of integers in `0..=255`
    /// become [`Payload::Binary`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedPayload`] for any other shape.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => byte_array(&items)
                .map(|bytes| Self::Binary(Bytes::from(bytes)))
                .ok_or(BridgeError::UnsupportedPayload {
                    kind: "array of non-byte values",
                }),
            other => Err(BridgeError::UnsupportedPayload {
                kind: value_kind(&other),
            }),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self { Self::Text(text) }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self { Self::Text(text.to_owned()) }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self { Self::Binary(Bytes::from(bytes)) }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self { Self::Binary(Bytes::copy_from_slice(bytes)) }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self { Self::Binary(bytes) }
}

/// Typed value of a message property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Boolean property.
    Bool(bool),
    /// 64-bit signed integer property.
    Int(i64),
    /// 64-bit float property.
    Float(f64),
    /// String property.
    String(String),
    /// Byte string property.
    Bytes(Vec<u8>),
}

impl PropertyValue {
    /// Convert a dynamic host value into a property value.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedProperty`] naming `key` when the
    /// value is null, an object, or an array that is not a byte string.
    pub fn from_value(key: &str, value: Value) -> Result<Self> {
        let unsupported = |kind| BridgeError::UnsupportedProperty {
            key: key.to_owned(),
            kind,
        };
        match value {
            Value::Bool(flag) => Ok(Self::Bool(flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float))
                .ok_or_else(|| unsupported("number")),
            Value::String(text) => Ok(Self::String(text)),
            Value::Array(items) => byte_array(&items)
                .map(Self::Bytes)
                .ok_or_else(|| unsupported("array of non-byte values")),
            other => Err(unsupported(value_kind(&other))),
        }
    }

    /// Convert a map of dynamic host values into [`Properties`].
    ///
    /// # Errors
    ///
    /// Returns the first [`BridgeError::UnsupportedProperty`] encountered.
    pub fn from_values(values: HashMap<String, Value>) -> Result<Properties> {
        values
            .into_iter()
            .map(|(key, value)| Self::from_value(&key, value).map(|value| (key, value)))
            .collect()
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self { Self::Int(value) }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self { Self::Int(i64::from(value)) }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self { Self::Float(value) }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self { Self::String(value.to_owned()) }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self { Self::String(value) }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self { Self::Bytes(value) }
}

fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A message to be put on a queue.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    /// Destination queue.
    pub queue: String,
    /// Queue on which replies are requested; empty requests no reply.
    pub reply_to: String,
    /// Message body.
    pub payload: Payload,
    /// Explicit correlation identifier, if any.
    pub correlation_id: Option<CorrelationId>,
    /// Properties attached through a message handle.
    pub properties: Properties,
}

impl OutboundMessage {
    /// Create a message for `queue` requesting replies on `reply_to`.
    #[must_use]
    pub fn new(
        queue: impl Into<String>,
        reply_to: impl Into<String>,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            queue: queue.into(),
            reply_to: reply_to.into(),
            payload: payload.into(),
            correlation_id: None,
            properties: Properties::new(),
        }
    }

    /// Set an explicit correlation identifier.
    #[must_use]
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Add a single property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace the property set.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Build the descriptor the message is put with.
    pub(crate) fn descriptor(&self) -> MessageDescriptor {
        MessageDescriptor {
            format: self.payload.format(),
            reply_to_queue: self.reply_to.clone(),
            correlation_id: self.correlation_id.unwrap_or_default(),
            ..MessageDescriptor::default()
        }
    }
}

/// A message retrieved from a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message body.
    pub payload: Bytes,
    /// Identifier assigned when the message was put.
    pub message_id: MessageId,
    /// Correlation identifier the message carried.
    pub correlation_id: CorrelationId,
    /// Reply-to queue requested by the sender.
    pub reply_to_queue: String,
    /// Format marker of the body.
    pub format: MessageFormat,
}

impl InboundMessage {
    pub(crate) fn from_parts(payload: Bytes, descriptor: MessageDescriptor) -> Self {
        Self {
            payload,
            message_id: descriptor.message_id,
            correlation_id: descriptor.correlation_id,
            reply_to_queue: descriptor.reply_to_queue,
            format: descriptor.format,
        }
    }

    /// Decode the body as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String { String::from_utf8_lossy(&self.payload).into_owned() }
}

/// Result of a receive that did not fail.
///
/// An empty-bodied reply and "nothing arrived yet" are different variants;
/// callers never need to inspect the payload to tell them apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A message with the requested correlation identifier was retrieved.
    Matched(InboundMessage),
    /// No matching message arrived within the wait interval.
    NotYetAvailable,
}

impl ReceiveOutcome {
    /// Status code reported to host engines; receives that did not fail
    /// always report `0`.
    #[must_use]
    pub const fn status_code(&self) -> i32 { 0 }

    /// Returns `true` when a message was matched.
    #[must_use]
    pub const fn is_matched(&self) -> bool { matches!(self, Self::Matched(_)) }

    /// Borrow the matched message, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&InboundMessage> {
        match self {
            Self::Matched(message) => Some(message),
            Self::NotYetAvailable => None,
        }
    }

    /// Collapse into the text body, using an empty string when nothing was
    /// matched.
    ///
    /// This is the view exposed to host engines that only understand a
    /// payload string; it cannot distinguish an empty reply from no reply.
    #[must_use]
    pub fn into_payload(self) -> String {
        match self {
            Self::Matched(message) => message.text(),
            Self::NotYetAvailable => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn text_payload_uses_string_format() {
        let payload = Payload::from("hello");
        assert_eq!(payload.format(), MessageFormat::String);
        assert_eq!(payload.as_bytes(), b"hello");
    }

    #[test]
    fn binary_payload_uses_raw_format() {
        let payload = Payload::from(vec![0_u8, 1, 2]);
        assert_eq!(payload.format(), MessageFormat::None);
        assert_eq!(payload.as_bytes(), &[0, 1, 2]);
    }

    #[test]
    fn dynamic_string_becomes_text() {
        let payload = Payload::from_value(json!("Sent Message")).expect("string is supported");
        assert_eq!(payload, Payload::Text("Sent Message".into()));
    }

    #[test]
    fn dynamic_byte_array_becomes_binary() {
        let payload = Payload::from_value(json!([1, 2, 255])).expect("byte array is supported");
        assert_eq!(payload, Payload::Binary(Bytes::from_static(&[1, 2, 255])));
    }

    #[rstest]
    #[case(json!(null), "null")]
    #[case(json!(42), "number")]
    #[case(json!({"a": 1}), "object")]
    #[case(json!([1, 256]), "array of non-byte values")]
    #[case(json!(["x"]), "array of non-byte values")]
    fn unsupported_payload_shapes_are_rejected(#[case] value: Value, #[case] kind: &str) {
        match Payload::from_value(value) {
            Err(BridgeError::UnsupportedPayload { kind: got }) => assert_eq!(got, kind),
            other => panic!("expected UnsupportedPayload, got {other:?}"),
        }
    }

    #[test]
    fn dynamic_properties_are_typed() {
        let values = HashMap::from([
            ("apiVersion".to_owned(), json!(2)),
            ("extraText".to_owned(), json!("extra")),
            ("ratio".to_owned(), json!(0.5)),
            ("flag".to_owned(), json!(true)),
        ]);
        let properties = PropertyValue::from_values(values).expect("all values supported");
        assert_eq!(properties.get("apiVersion"), Some(&PropertyValue::Int(2)));
        assert_eq!(
            properties.get("extraText"),
            Some(&PropertyValue::String("extra".into()))
        );
        assert_eq!(properties.get("ratio"), Some(&PropertyValue::Float(0.5)));
        assert_eq!(properties.get("flag"), Some(&PropertyValue::Bool(true)));
    }

    #[test]
    fn null_property_names_the_key() {
        let err = PropertyValue::from_value("missing", json!(null)).expect_err("null rejected");
        assert!(matches!(
            err,
            BridgeError::UnsupportedProperty { ref key, kind: "null" } if key == "missing"
        ));
    }

    #[test]
    fn not_yet_available_collapses_to_empty_payload() {
        let outcome = ReceiveOutcome::NotYetAvailable;
        assert_eq!(outcome.status_code(), 0);
        assert!(!outcome.is_matched());
        assert_eq!(outcome.into_payload(), "");
    }
}
