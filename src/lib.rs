//! Spread Pulse - Behavioral telemetry for tarot spread pages
//!
//! Pulse records how visitors interact with a spread (session start, card
//! flips, spread readiness, click-throughs) and turns the stored events into
//! dashboard statistics:
//! collector → `{sessionId, events}` batches → ingestion → event store → aggregation.
//!
//! ## Modules
//!
//! - **Collector**: buffered client-side event tracking with threshold, debounce and
//!   lifecycle-triggered flushes
//! - **Schema**: the ingestion wire contract and event-store rows
//! - **Stats**: windowed session, funnel, click-through, timing and device statistics

pub mod collector;
pub mod config;
pub mod error;
pub mod schema;
pub mod stats;

#[cfg(feature = "cli")]
pub mod logging;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use collector::{Collector, PageContext, TrackOptions, Transport};
pub use config::PulseConfig;
pub use error::{ComputeError, DeliveryError, StorageError};

// Schema exports
pub use schema::{Event, EventName, EventRow, IngestAdapter, IngestPayload, SCHEMA_VERSION};

// Stats exports
pub use stats::{compute_behavior_stats, rows_to_stats_json, BehaviorStats, StatsProcessor, StatsWindow};

/// Pulse version embedded in every stats report
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for stats reports
pub const PRODUCER_NAME: &str = "spread-pulse";
