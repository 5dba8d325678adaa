//! pulse.ingest.v1 schema
//!
//! Defines the collector's wire payload and the event-store row contract the
//! aggregation engine reads, plus the adapter between the two.

mod adapter;
mod wire;

pub use adapter::*;
pub use wire::*;
