//! Dashboard report encoder
//!
//! Wraps a computed [`BehaviorStats`] in a report envelope carrying producer
//! metadata and the window it was computed over.

use crate::error::ComputeError;
use crate::stats::types::{BehaviorStats, StatsWindow};
use crate::{PRODUCER_NAME, PULSE_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "pulse.stats.v1";

/// Producer metadata embedded in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serialized dashboard response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub window_days: StatsWindow,
    pub cutoff_utc: String,
    pub computed_at_utc: String,
    pub stats: BehaviorStats,
}

/// Report encoder
pub struct StatsEncoder {
    instance_id: String,
}

impl Default for StatsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap stats computed for `window` at `now` into a report
    pub fn encode(&self, stats: BehaviorStats, window: StatsWindow, now: DateTime<Utc>) -> StatsReport {
        StatsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: PULSE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            window_days: window,
            cutoff_utc: window.cutoff(now).to_rfc3339(),
            computed_at_utc: now.to_rfc3339(),
            stats,
        }
    }

    /// Encode to a JSON string
    pub fn encode_to_json(
        &self,
        stats: BehaviorStats,
        window: StatsWindow,
        now: DateTime<Utc>,
    ) -> Result<String, ComputeError> {
        let report = self.encode(stats, window, now);
        serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
