//! Aggregation pipeline orchestration
//!
//! This module provides the public API for dashboard statistics. It reads one
//! windowed snapshot from the event store and runs the six independent
//! statistics over it.

use crate::error::ComputeError;
use crate::schema::{EventName, EventRow, IngestAdapter};
use crate::stats::devices::device_breakdown;
use crate::stats::encoder::StatsEncoder;
use crate::stats::funnel::{funnel, read_spread_ctr};
use crate::stats::sessions::{flip_distribution, session_stats};
use crate::stats::store::{EventStore, InMemoryEventStore, RowFilter};
use crate::stats::timing::time_to_first_flip;
use crate::stats::types::{BehaviorStats, StatsWindow};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Run all six statistics over an already-windowed row snapshot
pub fn aggregate(rows: &[EventRow]) -> BehaviorStats {
    BehaviorStats {
        session_stats: session_stats(rows),
        flip_distribution: flip_distribution(rows),
        funnel: funnel(rows),
        read_spread_ctr: read_spread_ctr(rows),
        time_to_first_flip: time_to_first_flip(rows),
        device_breakdown: device_breakdown(rows),
    }
}

/// Compute dashboard stats for the window ending at `now`.
///
/// Either the full object is returned or the store error is; there is no
/// partial result.
pub fn compute_behavior_stats(
    store: &dyn EventStore,
    window: StatsWindow,
    now: DateTime<Utc>,
) -> Result<BehaviorStats, ComputeError> {
    let filter = RowFilter::since(window.cutoff(now)).with_names(&EventName::ALL);
    let rows = store.query(&filter)?;
    debug!(window_days = window.days(), rows = rows.len(), "loaded stats snapshot");

    let stats = aggregate(&rows);
    info!(
        window_days = window.days(),
        total_sessions = stats.session_stats.total_sessions,
        "computed behavior stats"
    );
    Ok(stats)
}

/// Convert event rows (NDJSON) to a stats report JSON (stateless, one-shot).
///
/// # Arguments
/// * `rows_ndjson` - Event rows, one JSON object per line
/// * `window_days` - 7, 14 or 30
///
/// # Example
/// ```ignore
/// let report_json = rows_to_stats_json(rows, 7)?;
/// ```
pub fn rows_to_stats_json(rows_ndjson: &str, window_days: u32) -> Result<String, ComputeError> {
    let window = StatsWindow::try_from(window_days)?;
    let rows = IngestAdapter::parse_rows_ndjson(rows_ndjson)?;
    let store = InMemoryEventStore::from_rows(rows);

    let now = Utc::now();
    let stats = compute_behavior_stats(&store, window, now)?;
    StatsEncoder::new().encode_to_json(stats, window, now)
}

/// Stateful processor bound to one event store.
///
/// Use this when the same store serves repeated dashboard requests.
pub struct StatsProcessor<S: EventStore> {
    store: S,
    encoder: StatsEncoder,
}

impl Default for StatsProcessor<InMemoryEventStore> {
    fn default() -> Self {
        Self::new(InMemoryEventStore::new())
    }
}

impl<S: EventStore> StatsProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            encoder: StatsEncoder::new(),
        }
    }

    /// Underlying store, e.g. for ingestion
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stats for the window ending now
    pub fn stats(&self, window: StatsWindow) -> Result<BehaviorStats, ComputeError> {
        self.stats_at(window, Utc::now())
    }

    /// Stats for the window ending at `now`
    pub fn stats_at(
        &self,
        window: StatsWindow,
        now: DateTime<Utc>,
    ) -> Result<BehaviorStats, ComputeError> {
        compute_behavior_stats(&self.store, window, now)
    }

    /// Encoded report for the window ending at `now`
    pub fn report_json(
        &self,
        window: StatsWindow,
        now: DateTime<Utc>,
    ) -> Result<String, ComputeError> {
        let stats = self.stats_at(window, now)?;
        self.encoder.encode_to_json(stats, window, now)
    }
}
