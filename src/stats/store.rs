//! Event store access
//!
//! The aggregation engine never owns event data. It reads filtered rows through
//! [`EventStore`], which a persistence layer implements. [`InMemoryEventStore`]
//! backs the CLI, the FFI surface and tests.

use crate::error::ComputeError;
use crate::schema::{EventName, EventRow, IngestAdapter, IngestPayload};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

/// Row selection pushed down to the store
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    /// Inclusive lower bound on `created_at`
    pub since: DateTime<Utc>,
    /// Event names to return; empty means every name
    pub names: Vec<EventName>,
}

impl RowFilter {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since,
            names: Vec::new(),
        }
    }

    pub fn with_names(mut self, names: &[EventName]) -> Self {
        self.names.extend_from_slice(names);
        self
    }

    pub fn matches(&self, row: &EventRow) -> bool {
        row.created_at >= self.since
            && (self.names.is_empty() || self.names.iter().any(|name| row.is(*name)))
    }
}

/// Read access to persisted event rows
pub trait EventStore: Send + Sync {
    /// Return matching rows in insertion order
    fn query(&self, filter: &RowFilter) -> Result<Vec<EventRow>, ComputeError>;
}

/// Event store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    rows: RwLock<Vec<EventRow>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<EventRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Append already-flattened rows
    pub fn insert_rows(&self, rows: impl IntoIterator<Item = EventRow>) {
        self.rows.write().extend(rows);
    }

    /// Accept one collector batch, stamping every row with `received_at`.
    ///
    /// Returns the number of rows stored.
    pub fn ingest(
        &self,
        payload: &IngestPayload,
        received_at: DateTime<Utc>,
    ) -> Result<usize, ComputeError> {
        let rows = IngestAdapter::to_rows(payload, received_at)?;
        let count = rows.len();
        self.insert_rows(rows);
        debug!(session_id = %payload.session_id, rows = count, "ingested batch");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn query(&self, filter: &RowFilter) -> Result<Vec<EventRow>, ComputeError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Event;
    use chrono::{Duration, TimeZone};

    fn row(name: &str, created_at: DateTime<Utc>) -> EventRow {
        EventRow {
            session_id: "s1".to_string(),
            event_name: name.to_string(),
            properties: "{}".to_string(),
            timestamp: created_at.timestamp_millis(),
            created_at,
        }
    }

    #[test]
    fn test_query_filters_by_cutoff_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let cutoff = now - Duration::days(7);
        let store = InMemoryEventStore::from_rows(vec![
            row("session_start", cutoff - Duration::seconds(1)),
            row("session_start", cutoff),
            row("card_flip", now),
        ]);

        let rows = store.query(&RowFilter::since(cutoff)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, cutoff);
    }

    #[test]
    fn test_query_filters_by_name() {
        let now = Utc::now();
        let store = InMemoryEventStore::from_rows(vec![
            row("session_start", now),
            row("card_flip", now),
            row("page_view", now),
        ]);

        let filter = RowFilter::since(now - Duration::days(1)).with_names(&[EventName::CardFlip]);
        let rows = store.query(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_name, "card_flip");

        // Unfiltered queries still return unknown names; statistics ignore them.
        let all = store.query(&RowFilter::since(now - Duration::days(1))).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_ingest_payload() {
        let store = InMemoryEventStore::new();
        let payload = IngestPayload {
            session_id: "abcdefghijkl".to_string(),
            events: vec![
                Event {
                    name: "session_start".to_string(),
                    timestamp: 1,
                    properties: Default::default(),
                },
                Event {
                    name: "card_flip".to_string(),
                    timestamp: 2,
                    properties: Default::default(),
                },
            ],
        };

        assert!(store.is_empty());
        assert_eq!(store.ingest(&payload, Utc::now()).unwrap(), 2);
        assert_eq!(store.len(), 2);

        let invalid = IngestPayload {
            session_id: String::new(),
            events: vec![],
        };
        assert!(store.ingest(&invalid, Utc::now()).is_err());
        assert_eq!(store.len(), 2);
    }
}
