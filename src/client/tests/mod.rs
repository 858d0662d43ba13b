//! Unit tests for the request/reply client.

mod error_handling;
mod tracing;

use rstest::fixture;

use super::Client;
use crate::{config::ConnectionParams, transport::memory::MemoryBroker};

const REQUEST_QUEUE: &str = "DEV.QUEUE.1";
const REPLY_QUEUE: &str = "DEV.QUEUE.2";

#[fixture]
fn broker() -> MemoryBroker {
    MemoryBroker::new("QM1")
        .with_queue(REQUEST_QUEUE)
        .with_queue(REPLY_QUEUE)
}

fn params() -> ConnectionParams {
    ConnectionParams::new("QM1", "localhost", 1414, "DEV.APP.SVRCONN")
}

async fn client(broker: &MemoryBroker) -> Client<MemoryBroker> {
    let (client, status) = Client::new_client(broker.clone(), params())
        .await
        .expect("client initializes");
    assert_eq!(status, 0);
    client
}
