//! Aggregated behavior statistics types
//!
//! These are the read-only shapes returned to the operator dashboard. Every
//! field serializes in camelCase to match the dashboard query contract.

use crate::error::ComputeError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Trailing day window a stats request is computed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum StatsWindow {
    #[default]
    Week,
    Fortnight,
    Month,
}

impl StatsWindow {
    pub fn days(&self) -> u32 {
        match self {
            StatsWindow::Week => 7,
            StatsWindow::Fortnight => 14,
            StatsWindow::Month => 30,
        }
    }

    /// Oldest `created_at` still inside the window ending at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.days()))
    }
}

impl TryFrom<u32> for StatsWindow {
    type Error = ComputeError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(StatsWindow::Week),
            14 => Ok(StatsWindow::Fortnight),
            30 => Ok(StatsWindow::Month),
            other => Err(ComputeError::InvalidWindow(other)),
        }
    }
}

impl From<StatsWindow> for u32 {
    fn from(window: StatsWindow) -> Self {
        window.days()
    }
}

/// Landing and engagement totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Distinct sessions with a `session_start` row
    pub total_sessions: u64,
    /// Distinct sessions with at least one `card_flip` row
    pub engaged_sessions: u64,
    /// `(total - engaged) / total * 100`, 0 when there are no sessions
    pub bounce_rate: f64,
}

/// One bucket of the flip-count histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipBucket {
    /// Flips observed in the session, capped at 3
    pub flip_count: u8,
    pub sessions: u64,
    pub percentage: f64,
}

/// One stage of the landing funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    pub step: String,
    pub sessions: u64,
    /// Share of the Landed step
    pub percentage: f64,
    /// Loss relative to the immediately preceding step
    pub dropoff: f64,
}

/// Read-spread click-through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickThrough {
    /// Distinct sessions that reached `spread_ready`
    pub eligible: u64,
    /// Distinct sessions with a `read_spread_click`
    pub clicked: u64,
    pub ctr: f64,
}

/// Time from session start to the first revealed card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToFirstFlip {
    pub avg_ms: f64,
    pub median_ms: f64,
    /// Sessions that contributed a sample
    pub sample_size: u64,
}

/// Mobile / desktop mix of session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBreakdown {
    pub mobile: u64,
    pub desktop: u64,
    pub mobile_pct: f64,
    pub desktop_pct: f64,
}

/// Composed dashboard statistics for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorStats {
    pub session_stats: SessionStats,
    pub flip_distribution: Vec<FlipBucket>,
    pub funnel: Vec<FunnelStep>,
    pub read_spread_ctr: ClickThrough,
    pub time_to_first_flip: TimeToFirstFlip,
    pub device_breakdown: DeviceBreakdown,
}

/// `part / whole * 100`, or 0 when `whole` is 0
pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}
