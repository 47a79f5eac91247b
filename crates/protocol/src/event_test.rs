//! Tests for the event type registry

use std::collections::HashSet;

use crate::EventType;

#[test]
fn test_tags_are_unique_and_dense() {
    let tags: HashSet<u8> = EventType::ALL.iter().map(|t| t.as_u8()).collect();
    assert_eq!(tags.len(), EventType::ALL.len());
    for (i, t) in EventType::ALL.iter().enumerate() {
        assert_eq!(t.as_u8() as usize, i + 1);
    }
}

#[test]
fn test_from_u8_roundtrip() {
    for t in EventType::ALL {
        assert_eq!(EventType::from_u8(t.as_u8()), Some(t));
    }
    assert_eq!(EventType::from_u8(0), None);
    assert_eq!(EventType::from_u8(29), None);
    assert!(EventType::try_from(200u8).is_err());
}

#[test]
fn test_names_parse_back() {
    for t in EventType::ALL {
        assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
    }
    assert!("segments".parse::<EventType>().is_err());
}

#[test]
fn test_serde_name_matches_as_str() {
    for t in EventType::ALL {
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, format!("\"{}\"", t.as_str()));
        assert_eq!(serde_json::from_str::<EventType>(&json).unwrap(), t);
    }
}

#[test]
fn test_list_and_sync_kinds() {
    assert!(EventType::EnvoyMetricsV3.is_list());
    assert!(EventType::EbpfAccessLog.is_list());
    assert!(!EventType::Segment.is_list());

    assert!(EventType::ConfigurationSync.is_sync());
    assert!(EventType::AsyncProfilerMetadata.is_sync());
    assert!(!EventType::Log.is_sync());
}
