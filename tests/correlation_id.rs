//! Correlation id handling on receive and format tagging on send.

use std::time::Duration;

use mqbridge::{
    BridgeError,
    IdParseError,
    Payload,
    Properties,
    transport::{MessageFormat, memory::MemoryBroker},
};
use proptest::prelude::*;
use rstest::rstest;

mod common;
use common::{REPLY_QUEUE, REQUEST_QUEUE, broker, connected_client};

#[rstest]
#[case::not_hex("not-valid-hex")]
#[case::odd_length("abc")]
#[case::too_long(&"00".repeat(25))]
#[case::empty("")]
#[tokio::test(start_paused = true)]
async fn malformed_correlation_id_never_reaches_transport(
    broker: MemoryBroker,
    #[case] correlation_id: &str,
) {
    let client = connected_client(&broker).await;
    let before = broker.stats();
    let err = client
        .receive(REPLY_QUEUE, correlation_id, Duration::from_millis(100))
        .await
        .expect_err("malformed id");
    let BridgeError::InvalidCorrelationId { value, .. } = &err else {
        panic!("expected an invalid correlation id, got {err:?}");
    };
    assert_eq!(value, correlation_id);
    assert_eq!(broker.stats(), before);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn invalid_digit_is_reported_with_offset(broker: MemoryBroker) {
    let client = connected_client(&broker).await;
    let err = client
        .receive(REPLY_QUEUE, "0g", Duration::ZERO)
        .await
        .expect_err("bad digit");
    assert!(matches!(
        err,
        BridgeError::InvalidCorrelationId {
            source: IdParseError::InvalidDigit { digit: 'g', offset: 1 },
            ..
        }
    ));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn short_ids_match_zero_padded_correlation(broker: MemoryBroker) {
    let client = connected_client(&broker).await;
    let mut bytes = [0_u8; 24];
    bytes[0] = 0xab;
    broker.enqueue(
        REPLY_QUEUE,
        mqbridge::transport::MessageDescriptor {
            correlation_id: mqbridge::CorrelationId::from_bytes(bytes),
            ..Default::default()
        },
        "padded",
    );
    let outcome = client
        .receive(REPLY_QUEUE, "AB", Duration::ZERO)
        .await
        .expect("receive");
    assert_eq!(outcome.into_payload(), "padded");
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop_oneof![
        any::<String>().prop_map(Payload::Text),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(Payload::from),
    ]
}

proptest! {
    #[test]
    fn format_is_string_exactly_for_text_payloads(payload in payload_strategy()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");

        rt.block_on(async {
            let broker = broker();
            let client = connected_client(&broker).await;
            let is_text = matches!(payload, Payload::Text(_));
            client
                .send(REQUEST_QUEUE, REPLY_QUEUE, payload.clone(), &Properties::new(), false)
                .await
                .expect("send");
            let stored = broker.browse(REQUEST_QUEUE);
            prop_assert_eq!(stored.len(), 1);
            prop_assert_eq!(stored[0].descriptor.format == MessageFormat::String, is_text);
            prop_assert_eq!(&stored[0].payload[..], payload.as_bytes());
            Ok(())
        })?;
    }
}
