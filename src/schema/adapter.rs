//! Ingestion adapter: wire payloads to event-store rows
//!
//! Handles parsing collector batches (single object, JSON array or NDJSON) and
//! flattening them into [`EventRow`]s with the properties re-serialized as JSON
//! strings, which is the shape the aggregation engine consumes.

use crate::error::ComputeError;
use crate::schema::wire::*;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// Adapter for converting ingestion payloads to event rows
pub struct IngestAdapter;

impl IngestAdapter {
    /// Parse a single payload object or a JSON array of payloads
    pub fn parse_payloads(json: &str) -> Result<Vec<IngestPayload>, ComputeError> {
        let trimmed = json.trim_start();
        if trimmed.starts_with('[') {
            Ok(serde_json::from_str(trimmed)?)
        } else {
            let payload: IngestPayload = serde_json::from_str(trimmed)?;
            Ok(vec![payload])
        }
    }

    /// Parse NDJSON (one payload per line)
    pub fn parse_payloads_ndjson(ndjson: &str) -> Result<Vec<IngestPayload>, ComputeError> {
        parse_ndjson(ndjson)
    }

    /// Parse NDJSON (one event row per line)
    pub fn parse_rows_ndjson(ndjson: &str) -> Result<Vec<EventRow>, ComputeError> {
        parse_ndjson(ndjson)
    }

    /// Parse a JSON array of event rows
    pub fn parse_rows_array(json: &str) -> Result<Vec<EventRow>, ComputeError> {
        let rows: Vec<EventRow> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Flatten one payload into event rows stamped with the receipt time.
    ///
    /// Invalid payloads are rejected as a whole; a batch is never partially stored.
    pub fn to_rows(
        payload: &IngestPayload,
        received_at: DateTime<Utc>,
    ) -> Result<Vec<EventRow>, ComputeError> {
        payload
            .validate()
            .map_err(|e| ComputeError::InvalidPayload(e.to_string()))?;

        payload
            .events
            .iter()
            .map(|event| {
                let properties = serde_json::to_string(&event.properties)
                    .map_err(|e| ComputeError::EncodingError(e.to_string()))?;
                Ok(EventRow {
                    session_id: payload.session_id.clone(),
                    event_name: event.name.clone(),
                    properties,
                    timestamp: event.timestamp,
                    created_at: received_at,
                })
            })
            .collect()
    }

    /// Validate a batch of payloads, returning only the failures
    pub fn validate_payloads(payloads: &[IngestPayload]) -> Vec<ValidationResult> {
        payloads
            .iter()
            .enumerate()
            .map(|(idx, payload)| ValidationResult {
                index: idx,
                session_id: payload.session_id.clone(),
                result: payload.validate().err(),
            })
            .filter(|r| r.result.is_some())
            .collect()
    }
}

/// Result of payload validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub session_id: String,
    pub result: Option<ValidationError>,
}

fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, ComputeError> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                return Err(ComputeError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_payload_json() -> &'static str {
        r#"{
            "sessionId": "k3j9x0q2m8a1",
            "events": [
                {"name": "session_start", "timestamp": 1705327200000, "properties": {"device_class": "mobile", "elapsed_ms": 0}},
                {"name": "card_flip", "timestamp": 1705327203400, "properties": {"card_index": 0, "cards_revealed_count": 1, "elapsed_ms": 3400}}
            ]
        }"#
    }

    #[test]
    fn test_parse_single_payload() {
        let payloads = IngestAdapter::parse_payloads(sample_payload_json()).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].session_id, "k3j9x0q2m8a1");
        assert_eq!(payloads[0].events.len(), 2);
    }

    #[test]
    fn test_parse_payload_array() {
        let json = format!("[{}, {}]", sample_payload_json(), sample_payload_json());
        let payloads = IngestAdapter::parse_payloads(&json).unwrap();
        assert_eq!(payloads.len(), 2);
    }

    #[test]
    fn test_to_rows() {
        let received_at = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 5).unwrap();
        let payloads = IngestAdapter::parse_payloads(sample_payload_json()).unwrap();
        let rows = IngestAdapter::to_rows(&payloads[0], received_at).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.session_id == "k3j9x0q2m8a1"));
        assert!(rows.iter().all(|r| r.created_at == received_at));
        assert_eq!(rows[1].event_name, "card_flip");
        assert_eq!(rows[1].timestamp, 1705327203400);

        let props = rows[1].parse_properties().unwrap();
        assert_eq!(props["cards_revealed_count"], 1);
        assert_eq!(props["elapsed_ms"], 3400);
    }

    #[test]
    fn test_to_rows_rejects_invalid_payload() {
        let payload = IngestPayload {
            session_id: String::new(),
            events: vec![],
        };
        let err = IngestAdapter::to_rows(&payload, Utc::now()).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_rows_ndjson() {
        let ndjson = r#"{"sessionId":"s1","eventName":"session_start","properties":"{}","timestamp":1,"createdAt":"2024-01-15T14:00:00Z"}

{"sessionId":"s1","eventName":"card_flip","properties":"{\"cards_revealed_count\":1}","timestamp":2,"createdAt":"2024-01-15T14:00:01Z"}"#;

        let rows = IngestAdapter::parse_rows_ndjson(ndjson).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].event_name, "card_flip");
    }

    #[test]
    fn test_parse_rows_ndjson_reports_line_number() {
        let ndjson = "{\"sessionId\":\"s1\",\"eventName\":\"talk_click\",\"properties\":\"{}\",\"timestamp\":1,\"createdAt\":\"2024-01-15T14:00:00Z\"}\nnot json";
        let err = IngestAdapter::parse_rows_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_validate_payloads() {
        let mut payloads = IngestAdapter::parse_payloads(sample_payload_json()).unwrap();
        payloads.push(IngestPayload {
            session_id: String::new(),
            events: vec![],
        });

        let results = IngestAdapter::validate_payloads(&payloads);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].result, Some(ValidationError::EmptySessionId));
    }
}
