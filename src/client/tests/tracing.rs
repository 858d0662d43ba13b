//! Unit tests for client tracing spans and per-operation timing.
//!
//! Tests use `#[traced_test]` from `tracing-test` combined with `rstest` and
//! `tokio::test`. Span names appear in event lines as context prefixes, so
//! tests enable per-operation timing to produce an event within each span.

use std::time::Duration;

use rstest::rstest;
use tracing_test::traced_test;

use super::{REPLY_QUEUE, REQUEST_QUEUE, broker, params};
use crate::{
    client::Client,
    message::Properties,
    tracing_config::TracingConfig,
    transport::memory::MemoryBroker,
};

async fn traced_client(broker: &MemoryBroker) -> Client<MemoryBroker> {
    let client = Client::new(broker.clone())
        .with_tracing_config(TracingConfig::default().with_all_timing(true));
    client.initialize(params()).await.expect("initialize");
    client
}

fn find_line(lines: &[&str], needles: &[&str]) -> Result<(), String> {
    lines
        .iter()
        .find(|line| needles.iter().all(|needle| line.contains(needle)))
        .map(|_| ())
        .ok_or_else(|| format!("no line containing {needles:?} in:\n{}", lines.join("\n")))
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn connect_emits_span_with_connection_name(broker: MemoryBroker) {
    let _client = traced_client(&broker).await;
    logs_assert(|lines: &[&str]| {
        find_line(lines, &["mq.connect", "localhost(1414)", "operation.timing"])
    });
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn send_records_message_id(broker: MemoryBroker) {
    let client = traced_client(&broker).await;
    let id = client
        .send(REQUEST_QUEUE, REPLY_QUEUE, "hello", &Properties::new(), false)
        .await
        .expect("send");
    let id = id.to_hex();
    logs_assert(|lines: &[&str]| find_line(lines, &["mq.send", "operation.timing", &id]));
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn receive_records_outcome(broker: MemoryBroker) {
    let client = traced_client(&broker).await;
    client
        .receive(REPLY_QUEUE, &"ab".repeat(24), Duration::from_millis(100))
        .await
        .expect("receive");
    logs_assert(|lines: &[&str]| {
        find_line(lines, &["mq.receive", "operation.timing", "not_yet_available"])
    });
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn simulate_span_nests_inside_send(broker: MemoryBroker) {
    let client = traced_client(&broker).await;
    client
        .send(REQUEST_QUEUE, REPLY_QUEUE, "hello", &Properties::new(), true)
        .await
        .expect("send");
    logs_assert(|lines: &[&str]| find_line(lines, &["mq.send", "mq.simulate", "replied"]));
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn disconnect_emits_span(broker: MemoryBroker) {
    let client = traced_client(&broker).await;
    client.disconnect().await.expect("disconnect");
    logs_assert(|lines: &[&str]| find_line(lines, &["mq.disconnect", "QM1", "operation.timing"]));
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn timing_is_off_by_default(broker: MemoryBroker) {
    let client = Client::new(broker);
    client.initialize(params()).await.expect("initialize");
    client
        .receive(REPLY_QUEUE, &"ab".repeat(24), Duration::ZERO)
        .await
        .expect("receive");
    assert!(!logs_contain("operation.timing"));
}
