//! Event model and the batch envelope shared by the wire and the store.

use serde::{Deserialize, Serialize};

/// A single reported occurrence: a type tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
}

impl Event {
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }
}

/// `{"events": [...]}`: the request body posted to the collector and the
/// blob persisted for each event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Borrowed form of [`EventBatch`] so serializing a log does not clone it.
#[derive(Serialize)]
struct EventBatchRef<'a> {
    events: &'a [Event],
}

impl EventBatch {
    /// Serialize a slice of events into the batch envelope.
    pub fn encode(events: &[Event]) -> serde_json::Result<String> {
        serde_json::to_string(&EventBatchRef { events })
    }

    /// Parse a batch envelope. Empty or whitespace-only input is an empty batch.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = EventBatch::encode(&[Event::new("click", "a")]).unwrap();
        assert_eq!(json, r#"{"events":[{"type":"click","data":"a"}]}"#);
    }

    #[test]
    fn test_decode_empty_and_missing_field() {
        assert!(EventBatch::decode("").unwrap().events.is_empty());
        assert!(EventBatch::decode("  \n").unwrap().events.is_empty());
        assert!(EventBatch::decode("{}").unwrap().events.is_empty());
    }

    #[test]
    fn test_decode_preserves_order() {
        let raw = r#"{"events":[{"type":"x","data":"1"},{"type":"x","data":"2"}]}"#;
        let batch = EventBatch::decode(raw).unwrap();
        assert_eq!(
            batch.events,
            vec![Event::new("x", "1"), Event::new("x", "2")]
        );
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(EventBatch::decode("not json").is_err());
    }
}
