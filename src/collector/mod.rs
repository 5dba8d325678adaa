//! Client-side event collection
//!
//! Records tarot-spread interactions into an in-memory queue and flushes them
//! to the ingestion endpoint in batches:
//!
//! ```text
//! track() -> EventQueue -> (threshold | debounce timer | hidden/unload) -> Transport
//! ```
//!
//! Host concerns are injected through traits: [`SessionStorage`] for the
//! tab-scoped session token, [`Transport`] for delivery, [`Timer`] and
//! [`Clock`] for time, and [`LifecycleHost`] for page visibility.

mod device;
mod lifecycle;
mod session;
mod state;
mod timer;
mod tracker;
mod transport;

pub use device::{DeviceClass, PageContext, MOBILE_MAX_WIDTH_PX};
pub use lifecycle::{LifecycleEvent, LifecycleHook, LifecycleHost, ManualLifecycle};
pub use session::{new_session_token, MemoryStorage, Session, SessionStorage};
pub use state::{CollectorState, EventQueue, OnceRegistry};
pub use timer::{Clock, SystemClock, ThreadTimer, Timer, TimerCallback};
pub use tracker::{Collector, CollectorBuilder, FlushOutcome, TrackOptions};
pub use transport::{deliver, DeliveryChannel, SpoolTransport, Transport};
