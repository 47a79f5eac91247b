//! Tests for protocol error types

use prost::Message;

use crate::EventType;
use crate::error::ProtocolError;
use crate::proto::ConfigurationSyncRequest;

#[test]
fn test_decode_error_names_event_type() {
    let source = ConfigurationSyncRequest::decode(&[0xff, 0xff][..]).unwrap_err();
    let err = ProtocolError::decode(EventType::ConfigurationSync, source);

    assert!(err.to_string().contains("configuration_sync"));
    assert!(err.is_malformed_input());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_frame_count_error() {
    let err = ProtocolError::frame_count(EventType::Jvm, 1, 3);
    assert!(matches!(
        err,
        ProtocolError::FrameCount {
            event_type: EventType::Jvm,
            expected: 1,
            actual: 3
        }
    ));
    assert_eq!(err.to_string(), "jvm expects 1 frame(s), got 3");
    assert!(err.is_malformed_input());
}

#[test]
fn test_lookup_errors_are_not_malformed_input() {
    assert!(!ProtocolError::NegativeTimestamp(-1).is_malformed_input());
    assert!(!ProtocolError::UnknownEventType("trace".into()).is_malformed_input());
    assert_eq!(
        ProtocolError::InvalidEventTypeTag(200).to_string(),
        "invalid event type tag: 200"
    );
}
