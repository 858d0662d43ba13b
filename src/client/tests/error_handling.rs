//! Error wrapping, cleanup on failure, and the error hook.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use rstest::rstest;
use serde_json::json;

use super::{REPLY_QUEUE, REQUEST_QUEUE, broker, client, params};
use crate::{
    client::Client,
    error::BridgeError,
    message::{OutboundMessage, Properties},
    transport::{
        MQRC_CONNECTION_BROKEN,
        MQRC_Q_MGR_QUIESCING,
        memory::{Fault, MemoryBroker},
    },
};

#[rstest]
#[tokio::test(start_paused = true)]
async fn property_handle_failure_aborts_before_put(broker: MemoryBroker) {
    let client = client(&broker).await;
    broker.inject(Fault::CreatePropertySet);
    let message =
        OutboundMessage::new(REQUEST_QUEUE, REPLY_QUEUE, "hello").with_property("k", true);
    let err = client
        .send_message(&message, false)
        .await
        .expect_err("handle creation fails");
    assert!(matches!(err, BridgeError::PropertyHandle { .. }));
    assert_eq!(broker.stats().puts, 0);
    assert_eq!(broker.stats().closes, broker.stats().opens);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn put_failure_is_wrapped_with_queue(broker: MemoryBroker) {
    let client = client(&broker).await;
    broker.set_quiescing(true);
    let err = client
        .send(REQUEST_QUEUE, REPLY_QUEUE, "hello", &Properties::new(), false)
        .await
        .expect_err("quiescing");
    let BridgeError::Put { queue, source } = err else {
        panic!("expected put error, got {err:?}");
    };
    assert_eq!(queue, REQUEST_QUEUE);
    assert_eq!(source.reason_code, MQRC_Q_MGR_QUIESCING);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unknown_queue_is_open_error(broker: MemoryBroker) {
    let client = client(&broker).await;
    let err = client
        .send("NO.SUCH.QUEUE", REPLY_QUEUE, "hello", &Properties::new(), false)
        .await
        .expect_err("unknown queue");
    assert!(matches!(err, BridgeError::QueueOpen { ref queue, .. } if queue == "NO.SUCH.QUEUE"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn send_value_rejects_unsupported_payload(broker: MemoryBroker) {
    let client = client(&broker).await;
    let err = client
        .send_value(REQUEST_QUEUE, REPLY_QUEUE, json!({"a": 1}), HashMap::new(), false)
        .await
        .expect_err("object payload");
    assert!(matches!(err, BridgeError::UnsupportedPayload { kind: "object" }));
    assert_eq!(broker.stats().opens, 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn transport_get_failure_is_receive_error(broker: MemoryBroker) {
    let client = client(&broker).await;
    broker.inject(Fault::Get(MQRC_CONNECTION_BROKEN));
    let err = client
        .receive(REPLY_QUEUE, &"aa".repeat(24), Duration::from_millis(10))
        .await
        .expect_err("get fails");
    assert!(matches!(err, BridgeError::Receive { .. }));
    assert_eq!(broker.stats().closes, broker.stats().opens);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn error_hook_sees_failures(broker: MemoryBroker) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let client = Client::new(broker.clone()).on_error(move |_err| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    client.initialize(params()).await.expect("initialize");

    let err = client
        .receive(REPLY_QUEUE, "zz", Duration::ZERO)
        .await
        .expect_err("invalid id");
    assert!(matches!(err, BridgeError::InvalidCorrelationId { .. }));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn destroy_failure_does_not_fail_the_send(broker: MemoryBroker) {
    let client = client(&broker).await;
    broker.inject(Fault::DestroyPropertySet);
    let message =
        OutboundMessage::new(REQUEST_QUEUE, REPLY_QUEUE, "hello").with_property("k", true);
    client.send_message(&message, false).await.expect("send");
    assert_eq!(broker.depth(REQUEST_QUEUE), 1);
}
