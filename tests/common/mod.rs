//! Shared utilities for integration tests.
//!
//! Provides fixtures for a loopback broker with a request and a reply queue
//! and for a client already initialized against it.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use mqbridge::{Client, ConnectionParams, transport::memory::MemoryBroker};
use rstest::fixture;

/// Queue requests are sent to.
pub const REQUEST_QUEUE: &str = "DEV.QUEUE.1";
/// Queue replies are requested on.
pub const REPLY_QUEUE: &str = "DEV.QUEUE.2";

/// A broker named `QM1` defining [`REQUEST_QUEUE`] and [`REPLY_QUEUE`].
#[fixture]
pub fn broker() -> MemoryBroker {
    MemoryBroker::new("QM1")
        .with_queue(REQUEST_QUEUE)
        .with_queue(REPLY_QUEUE)
}

/// Connection parameters accepted by [`broker`].
#[fixture]
pub fn params() -> ConnectionParams {
    ConnectionParams::new("QM1", "localhost", 1414, "DEV.APP.SVRCONN")
        .with_credentials("app", "passw0rd")
}

/// Create an initialized client for `broker`.
#[expect(
    clippy::expect_used,
    reason = "a client that cannot initialize must abort the test immediately"
)]
pub async fn connected_client(broker: &MemoryBroker) -> Client<MemoryBroker> {
    let (client, status) = Client::new_client(broker.clone(), params())
        .await
        .expect("client initializes");
    assert_eq!(status, 0);
    client
}
