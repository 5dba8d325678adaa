//! pulse.ingest.v1 wire definitions
//!
//! Types shared by the collector (producer) and the aggregation engine (consumer):
//! - Events as they are recorded on the client
//! - The batch payload posted on every flush
//! - Event-store rows as they are persisted after ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Current wire schema version
pub const SCHEMA_VERSION: &str = "pulse.ingest.v1";

/// Property key injected into every event at creation time
pub const ELAPSED_MS_KEY: &str = "elapsed_ms";

/// Free-form event properties
pub type Properties = Map<String, Value>;

/// The closed set of event names produced by the collector.
///
/// The aggregation engine matches on [`EventName::as_str`] only; rows carrying
/// any other name are ignored rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    SessionStart,
    CardFlip,
    SpreadReady,
    ReadSpreadClick,
    TalkClick,
    CardDetailClick,
}

impl EventName {
    pub const ALL: [EventName; 6] = [
        EventName::SessionStart,
        EventName::CardFlip,
        EventName::SpreadReady,
        EventName::ReadSpreadClick,
        EventName::TalkClick,
        EventName::CardDetailClick,
    ];

    /// Events that count as a conversion in the landing funnel
    pub const CONVERSIONS: [EventName; 3] = [
        EventName::ReadSpreadClick,
        EventName::TalkClick,
        EventName::CardDetailClick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::SessionStart => "session_start",
            EventName::CardFlip => "card_flip",
            EventName::SpreadReady => "spread_ready",
            EventName::ReadSpreadClick => "read_spread_click",
            EventName::TalkClick => "talk_click",
            EventName::CardDetailClick => "card_detail_click",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown event name: {s}"))
    }
}

/// A single interaction event recorded by the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (see [`EventName`])
    pub name: String,
    /// Client clock at record time, epoch milliseconds
    pub timestamp: i64,
    /// Free-form properties, always carrying `elapsed_ms`
    #[serde(default)]
    pub properties: Properties,
}

impl Event {
    /// Milliseconds since session start, as injected by the collector
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.properties.get(ELAPSED_MS_KEY).and_then(Value::as_i64)
    }
}

/// One flush worth of events, as posted to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestPayload {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub events: Vec<Event>,
}

impl IngestPayload {
    /// Validate the payload before it is accepted into the event store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_id.trim().is_empty() {
            return Err(ValidationError::EmptySessionId);
        }

        for (index, event) in self.events.iter().enumerate() {
            if event.name.trim().is_empty() {
                return Err(ValidationError::EmptyEventName { index });
            }
            if event.timestamp < 0 {
                return Err(ValidationError::NegativeTimestamp {
                    index,
                    timestamp: event.timestamp,
                });
            }
        }

        Ok(())
    }
}

/// A persisted event row, the unit the aggregation engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub session_id: String,
    pub event_name: String,
    /// Properties serialized as a JSON string, exactly as stored
    pub properties: String,
    /// Client timestamp, epoch milliseconds (orders rows within a session)
    pub timestamp: i64,
    /// Server receipt time (drives window filtering)
    pub created_at: DateTime<Utc>,
}

impl EventRow {
    /// Whether this row carries the given event name
    pub fn is(&self, name: EventName) -> bool {
        self.event_name == name.as_str()
    }

    /// Parse the stored properties string
    pub fn parse_properties(&self) -> Result<Properties, serde_json::Error> {
        serde_json::from_str(&self.properties)
    }
}

/// Validation errors for ingestion payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("sessionId must not be empty")]
    EmptySessionId,

    #[error("event {index} has an empty name")]
    EmptyEventName { index: usize },

    #[error("event {index} has a negative timestamp ({timestamp})")]
    NegativeTimestamp { index: usize, timestamp: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_uses_camel_case_session_id() {
        let payload = IngestPayload {
            session_id: "abc123def456".to_string(),
            events: vec![Event {
                name: "card_flip".to_string(),
                timestamp: 1_700_000_000_000,
                properties: json!({"elapsed_ms": 1200}).as_object().unwrap().clone(),
            }],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["sessionId"], "abc123def456");
        assert_eq!(value["events"][0]["name"], "card_flip");
        assert_eq!(value["events"][0]["properties"]["elapsed_ms"], 1200);
    }

    #[test]
    fn test_deserialize_payload_without_properties() {
        let json = r#"{"sessionId":"s1","events":[{"name":"talk_click","timestamp":5}]}"#;
        let payload: IngestPayload = serde_json::from_str(json).unwrap();
        assert!(payload.events[0].properties.is_empty());
        assert_eq!(payload.events[0].elapsed_ms(), None);
    }

    #[test]
    fn test_event_name_round_trips_through_str() {
        for name in EventName::ALL {
            assert_eq!(name.as_str().parse::<EventName>().unwrap(), name);
        }
        assert!("page_view".parse::<EventName>().is_err());
    }

    #[test]
    fn test_validation() {
        let mut payload = IngestPayload {
            session_id: " ".to_string(),
            events: vec![],
        };
        assert_eq!(payload.validate(), Err(ValidationError::EmptySessionId));

        payload.session_id = "s1".to_string();
        assert!(payload.validate().is_ok());

        payload.events.push(Event {
            name: String::new(),
            timestamp: 1,
            properties: Properties::new(),
        });
        assert_eq!(
            payload.validate(),
            Err(ValidationError::EmptyEventName { index: 0 })
        );

        payload.events[0].name = "card_flip".to_string();
        payload.events[0].timestamp = -4;
        assert!(matches!(
            payload.validate(),
            Err(ValidationError::NegativeTimestamp { index: 0, .. })
        ));
    }

    #[test]
    fn test_row_properties_parse_failure_is_reported() {
        let row = EventRow {
            session_id: "s1".to_string(),
            event_name: "session_start".to_string(),
            properties: "{not json".to_string(),
            timestamp: 0,
            created_at: Utc::now(),
        };
        assert!(row.is(EventName::SessionStart));
        assert!(row.parse_properties().is_err());
    }
}
