//! Time to first flip
//!
//! Each session contributes at most one sample: the `elapsed_ms` of its first
//! `card_flip` row (in client-timestamp order) tagged `cards_revealed_count == 1`.
//! Rows with unparseable properties, or missing either property, are skipped and
//! the scan continues; a session without a qualifying row contributes nothing.

use crate::schema::{EventName, EventRow, ELAPSED_MS_KEY};
use crate::stats::types::TimeToFirstFlip;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

const REVEALED_COUNT_KEY: &str = "cards_revealed_count";

/// Compute mean and median time to the first revealed card
pub fn time_to_first_flip(rows: &[EventRow]) -> TimeToFirstFlip {
    let samples = first_flip_samples(rows);

    TimeToFirstFlip {
        avg_ms: mean(&samples),
        median_ms: median(&samples),
        sample_size: samples.len() as u64,
    }
}

/// One `elapsed_ms` sample per qualifying session
pub fn first_flip_samples(rows: &[EventRow]) -> Vec<f64> {
    let mut by_session: HashMap<&str, Vec<&EventRow>> = HashMap::new();
    for row in rows.iter().filter(|row| row.is(EventName::CardFlip)) {
        by_session
            .entry(row.session_id.as_str())
            .or_default()
            .push(row);
    }

    by_session
        .into_values()
        .filter_map(|mut flips| {
            // Stable sort: rows sharing a timestamp keep insertion order.
            flips.sort_by_key(|row| row.timestamp);
            flips.into_iter().find_map(first_flip_elapsed)
        })
        .collect()
}

/// `elapsed_ms` of a row tagged as the first revealed card, if it is one
fn first_flip_elapsed(row: &EventRow) -> Option<f64> {
    let properties = match row.parse_properties() {
        Ok(properties) => properties,
        Err(e) => {
            trace!(session_id = %row.session_id, error = %e, "skipping unparseable card_flip row");
            return None;
        }
    };

    let revealed = properties.get(REVEALED_COUNT_KEY).and_then(Value::as_f64)?;
    if revealed != 1.0 {
        return None;
    }
    properties.get(ELAPSED_MS_KEY).and_then(Value::as_f64)
}

/// Arithmetic mean, 0 for no samples
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Median over ascending samples; even counts average the two central values.
/// 0 for no samples.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
