//! Connection lifecycle against the loopback broker.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use mqbridge::{
    BridgeError,
    Client,
    ConfigError,
    ConnectionManager,
    ConnectionParams,
    transport::{
        MQRC_NOT_AUTHORIZED,
        MQRC_Q_MGR_NAME_ERROR,
        memory::{Fault, MemoryBroker},
    },
};
use rstest::rstest;

mod common;
use common::{broker, params};

#[rstest]
#[tokio::test(start_paused = true)]
async fn concurrent_acquires_after_initialize_make_no_new_connection(
    broker: MemoryBroker,
    params: ConnectionParams,
) {
    let manager = Arc::new(ConnectionManager::new(broker.clone()));
    manager.initialize(params).await.expect("initialize");

    let tasks = (0..32).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.acquire().await.map(|_| ()) })
    });
    for result in join_all(tasks).await {
        result.expect("task joins").expect("acquire");
    }
    assert_eq!(broker.stats().connects, 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn lazy_reconnect_happens_once_under_contention(params: ConnectionParams) {
    let broker = MemoryBroker::new("QM1").with_connect_delay(Duration::from_millis(25));
    let manager = Arc::new(ConnectionManager::new(broker.clone()));
    manager.initialize(params).await.expect("initialize");
    manager.release().await.expect("release");

    let tasks = (0..32).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.acquire().await.map(|_| ()) })
    });
    for result in join_all(tasks).await {
        result.expect("task joins").expect("acquire");
    }
    assert_eq!(broker.stats().connects, 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn acquire_before_initialize_is_not_initialized(broker: MemoryBroker) {
    let manager = ConnectionManager::new(broker.clone());
    let err = manager.acquire().await.expect_err("not initialized");
    assert!(matches!(err, BridgeError::NotInitialized));
    assert_eq!(err.status_code(), 1);
    assert_eq!(broker.stats().connects, 0);
}

#[rstest]
#[case::queue_manager(ConnectionParams::new("", "localhost", 1414, "CH"), "MQ_QMGR")]
#[case::host(ConnectionParams::new("QM1", "", 1414, "CH"), "MQ_HOST")]
#[case::port(ConnectionParams::new("QM1", "localhost", 0, "CH"), "MQ_PORT")]
#[case::channel(ConnectionParams::new("QM1", "localhost", 1414, ""), "MQ_CHANNEL")]
#[tokio::test(start_paused = true)]
async fn missing_parameters_fail_without_connecting(
    broker: MemoryBroker,
    #[case] params: ConnectionParams,
    #[case] field: &str,
) {
    let err = Client::new_client(broker.clone(), params)
        .await
        .expect_err("invalid params");
    let BridgeError::Configuration(ConfigError::Missing(missing)) = err else {
        panic!("expected a configuration error, got {err:?}");
    };
    assert_eq!(missing, field);
    assert_eq!(broker.stats().connects, 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn wrong_queue_manager_reports_reason(params: ConnectionParams) {
    let broker = MemoryBroker::new("QM2");
    let err = Client::new_client(broker, params)
        .await
        .expect_err("wrong name");
    assert_eq!(err.status_code(), 2);
    assert_eq!(
        err.transport_error().map(|e| e.reason_code),
        Some(MQRC_Q_MGR_NAME_ERROR)
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn credentials_are_presented_on_connect(params: ConnectionParams) {
    let broker = MemoryBroker::new("QM1").with_credentials("app", "passw0rd");
    Client::new_client(broker.clone(), params)
        .await
        .expect("credentials accepted");
    let request = broker.last_connect_request().expect("connect recorded");
    assert_eq!(request.connection_name, "localhost(1414)");
    assert_eq!(request.channel, "DEV.APP.SVRCONN");
    assert!(request.client_binding);
    assert_eq!(
        request.credentials.map(|c| c.user_id),
        Some("app".to_owned())
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn rejected_credentials_are_connection_errors() {
    let broker = MemoryBroker::new("QM1").with_credentials("app", "other");
    let params = ConnectionParams::new("QM1", "localhost", 1414, "DEV.APP.SVRCONN")
        .with_credentials("app", "passw0rd");
    let err = Client::new_client(broker, params)
        .await
        .expect_err("rejected");
    assert!(matches!(
        err,
        BridgeError::Connection { ref queue_manager, ref source }
            if queue_manager == "QM1" && source.reason_code == MQRC_NOT_AUTHORIZED
    ));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_disconnect_clears_cache(broker: MemoryBroker, params: ConnectionParams) {
    let client = Client::new_client(broker.clone(), params)
        .await
        .expect("initialize")
        .0;
    broker.inject(Fault::Disconnect);
    client.disconnect().await.expect_err("disconnect fails");
    client.disconnect().await.expect("cache already cleared");
    assert!(!client.connections().is_connected().await);
}
