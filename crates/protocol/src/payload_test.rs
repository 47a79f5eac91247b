//! Tests for payload construction and re-encoding

use bytes::Bytes;
use prost::Message;

use crate::proto::{
    ConfigurationSyncRequest, Identifier, Node, StreamAccessLogsMessage, StreamMetricsMessage,
};
use crate::{EventType, Payload, ProtocolError};

#[test]
fn test_variant_matches_event_type_for_every_kind() {
    for t in EventType::ALL {
        let frames = if t == EventType::ConfigurationSync {
            vec![Bytes::from(
                ConfigurationSyncRequest::default().encode_to_vec(),
            )]
        } else if t.is_list() {
            Vec::new()
        } else {
            vec![Bytes::from_static(b"frame")]
        };
        let payload = Payload::from_frames(t, frames).unwrap();
        assert_eq!(payload.event_type(), t);
    }
}

#[test]
fn test_opaque_kinds_keep_original_bytes() {
    // Arbitrary bytes, including ones that are not a valid protobuf message
    let raw = Bytes::from_static(&[0x0a, 0x05, b'h', b'e', b'l', b'l', b'o', 0xff, 0x00]);

    for t in [EventType::Segment, EventType::Log, EventType::AsyncProfilerChunk] {
        let payload = Payload::from_frame(t, raw.clone()).unwrap();
        assert_eq!(payload.to_frames(), vec![raw.clone()]);
    }

    let payload =
        Payload::from_frames(EventType::EbpfAccessLog, vec![raw.clone(), raw.clone()]).unwrap();
    assert_eq!(payload.item_count(), 2);
    assert_eq!(payload.to_frames(), vec![raw.clone(), raw]);
}

#[test]
fn test_single_kind_rejects_multiple_frames() {
    let err = Payload::from_frames(
        EventType::Jvm,
        vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::FrameCount {
            expected: 1,
            actual: 2,
            ..
        }
    ));
    assert!(err.is_malformed_input());
}

#[test]
fn test_configuration_sync_is_decoded() {
    let request = ConfigurationSyncRequest {
        service: "service-0".into(),
        uuid: String::new(),
    };
    let frame = Bytes::from(request.encode_to_vec());

    let payload = Payload::from_frame(EventType::ConfigurationSync, frame.clone()).unwrap();
    assert_eq!(payload, Payload::ConfigurationSync(request));
    assert_eq!(payload.to_frames(), vec![frame]);
}

#[test]
fn test_malformed_structured_frame_is_decode_error() {
    let err = Payload::from_frame(
        EventType::ConfigurationSync,
        Bytes::from_static(&[0x0a, 0xff]),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Decode {
            event_type: EventType::ConfigurationSync,
            ..
        }
    ));
}

#[test]
fn test_envoy_messages_preserve_unread_fields() {
    let message = StreamAccessLogsMessage {
        identifier: Some(Identifier::new(
            Node {
                id: "sidecar~10.0.0.1".into(),
                cluster: "reviews".into(),
            },
            "test0",
        )),
        http_logs: Some(Bytes::from_static(&[0x0a, 0x02, 0x08, 0x01])),
        tcp_logs: None,
    };
    let frame = Bytes::from(message.encode_to_vec());

    let payload = Payload::from_frame(EventType::EnvoyAlsV3, frame.clone()).unwrap();
    assert_eq!(payload.item_count(), 1);
    assert_eq!(payload.to_frames(), vec![frame]);

    let Payload::EnvoyAlsV3(messages) = payload else {
        panic!("wrong variant");
    };
    let identifier = messages[0].identifier.as_ref().unwrap();
    assert_eq!(identifier.log_name, "test0");
    assert_eq!(identifier.decode_node().unwrap().cluster, "reviews");
}

#[test]
fn test_envoy_metrics_list() {
    let message = StreamMetricsMessage {
        identifier: None,
        envoy_metrics: vec![Bytes::from_static(&[0x0a, 0x01, b'x'])],
    };
    let frames = vec![
        Bytes::from(message.encode_to_vec()),
        Bytes::from(message.encode_to_vec()),
    ];
    let payload = Payload::from_frames(EventType::EnvoyMetricsV2, frames.clone()).unwrap();
    assert_eq!(payload.item_count(), 2);
    assert_eq!(payload.to_frames(), frames);
    assert!(payload.encoded_len() > 0);
}
