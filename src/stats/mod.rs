//! Behavior statistics aggregation module
//!
//! This module turns raw event rows inside a trailing day window into the six
//! dashboard statistics: session totals, flip histogram, landing funnel,
//! read-spread click-through, time to first flip, and device mix.
//!
//! Pipeline: EventStore → windowed snapshot → six pure statistics → BehaviorStats → report JSON

pub mod devices;
pub mod encoder;
pub mod funnel;
pub mod pipeline;
pub mod sessions;
pub mod store;
pub mod timing;
pub mod types;

pub use encoder::{StatsEncoder, StatsReport};
pub use pipeline::{aggregate, compute_behavior_stats, rows_to_stats_json, StatsProcessor};
pub use store::{EventStore, InMemoryEventStore, RowFilter};
pub use types::{
    BehaviorStats, ClickThrough, DeviceBreakdown, FlipBucket, FunnelStep, SessionStats,
    StatsWindow, TimeToFirstFlip,
};
