//! End-to-end request/reply flows through the simulator.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use mqbridge::{
    CorrelationId,
    Properties,
    ReceiveOutcome,
    SIMULATED_REPLY,
    transport::{MessageFormat, memory::MemoryBroker},
};
use rstest::rstest;

mod common;
use common::{REPLY_QUEUE, REQUEST_QUEUE, broker, connected_client};

#[rstest]
#[tokio::test(start_paused = true)]
async fn hello_round_trip_returns_simulated_reply(broker: MemoryBroker) {
    let client = connected_client(&broker).await;
    let id = client
        .send(REQUEST_QUEUE, REPLY_QUEUE, "hello", &Properties::new(), true)
        .await
        .expect("send with simulation");

    let outcome = client
        .receive(REPLY_QUEUE, &id.to_hex(), Duration::from_millis(5000))
        .await
        .expect("receive");
    let ReceiveOutcome::Matched(reply) = outcome else {
        panic!("expected the simulated reply, got {outcome:?}");
    };
    assert_eq!(reply.text(), SIMULATED_REPLY);
    assert_eq!(reply.correlation_id, CorrelationId::from(id));
    assert_eq!(reply.format, MessageFormat::String);
    assert_eq!(broker.depth(REQUEST_QUEUE), 0);
    assert_eq!(broker.depth(REPLY_QUEUE), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn receive_on_empty_queue_is_not_yet_available(broker: MemoryBroker) {
    let client = connected_client(&broker).await;
    let id = client
        .send(REQUEST_QUEUE, REPLY_QUEUE, "hello", &Properties::new(), false)
        .await
        .expect("send");

    let outcome = client
        .receive(REPLY_QUEUE, &id.to_hex(), Duration::from_millis(100))
        .await
        .expect("no error without a reply");
    assert_eq!(outcome, ReceiveOutcome::NotYetAvailable);
    assert_eq!(outcome.status_code(), 0);
    assert_eq!(outcome.into_payload(), "");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn replies_are_matched_to_their_own_requests(broker: MemoryBroker) {
    let client = Arc::new(connected_client(&broker).await);

    let mut ids = Vec::new();
    for n in 0..4 {
        let id = client
            .send(REQUEST_QUEUE, REPLY_QUEUE, format!("request {n}"), &Properties::new(), true)
            .await
            .expect("send");
        ids.push(id);
    }

    // Receive in reverse order so each get must skip unrelated replies.
    let outcomes = join_all(ids.iter().rev().map(|id| {
        let client = Arc::clone(&client);
        let hex = id.to_hex();
        async move {
            client
                .receive(REPLY_QUEUE, &hex, Duration::from_secs(1))
                .await
        }
    }))
    .await;

    for (outcome, id) in outcomes.into_iter().zip(ids.iter().rev()) {
        let outcome = outcome.expect("receive");
        let reply = outcome.message().expect("reply matched");
        assert_eq!(reply.correlation_id, CorrelationId::from(*id));
    }
    assert_eq!(broker.depth(REPLY_QUEUE), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn concurrent_senders_share_one_connection(broker: MemoryBroker) {
    let client = Arc::new(connected_client(&broker).await);
    let sends = (0..16).map(|n| {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .send(REQUEST_QUEUE, REPLY_QUEUE, format!("m{n}"), &Properties::new(), false)
                .await
        })
    });
    for result in join_all(sends).await {
        result.expect("task joins").expect("send");
    }
    assert_eq!(broker.depth(REQUEST_QUEUE), 16);
    assert_eq!(broker.stats().connects, 1);
    assert_eq!(broker.stats().closes, broker.stats().opens);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn simulator_without_request_leaves_no_reply(broker: MemoryBroker) {
    let client = connected_client(&broker).await;
    let outcome = mqbridge::ReplySimulator::new(client.connections())
        .with_wait(Duration::from_millis(50))
        .simulate(REQUEST_QUEUE)
        .await
        .expect("no request is not an error");
    assert_eq!(outcome, mqbridge::SimulationOutcome::NoMessageFound);
    assert_eq!(broker.depth(REPLY_QUEUE), 0);
}
