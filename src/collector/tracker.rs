//! The event collector
//!
//! Events are buffered in memory and flushed as `{sessionId, events}` batches
//! when either:
//! - the queue reaches the flush threshold (immediately)
//! - the debounce timer fires (at most one armed at a time)
//! - the host reports the page hidden or unloading
//!
//! Delivery failures never reach callers of [`Collector::track`]; the batch is
//! put back at the front of the queue and retried on the next flush.

use crate::collector::device::PageContext;
use crate::collector::lifecycle::{LifecycleEvent, LifecycleHost};
use crate::collector::session::{MemoryStorage, Session, SessionStorage};
use crate::collector::state::CollectorState;
use crate::collector::timer::{Clock, SystemClock, ThreadTimer, Timer};
use crate::collector::transport::{self, DeliveryChannel, Transport};
use crate::config::CollectorConfig;
use crate::error::DeliveryError;
use crate::schema::{Event, EventName, IngestPayload, Properties, ELAPSED_MS_KEY};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Per-call tracking options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackOptions {
    /// Emit this event name at most once per collector lifetime
    pub once: bool,
}

impl TrackOptions {
    pub fn once() -> Self {
        Self { once: true }
    }
}

/// Result of a flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued; no delivery call was made
    Empty,
    /// The batch was handed to the transport
    Delivered {
        events: usize,
        channel: DeliveryChannel,
    },
    /// Delivery failed and the batch is back at the front of the queue
    Requeued { events: usize },
}

struct Inner {
    config: CollectorConfig,
    state: Mutex<CollectorState>,
    storage: Box<dyn SessionStorage>,
    transport: Box<dyn Transport>,
    timer: Box<dyn Timer>,
    clock: Box<dyn Clock>,
}

impl Inner {
    /// Resolve the session on first use; it is fixed afterwards
    fn session<'a>(&self, state: &'a mut CollectorState, now_ms: i64) -> &'a Session {
        state.session.get_or_insert_with(|| {
            Session::load_or_create(self.storage.as_ref(), &self.config, now_ms)
        })
    }

    fn flush(&self) -> FlushOutcome {
        let payload = {
            let mut state = self.state.lock();
            if state.queue.is_empty() {
                return FlushOutcome::Empty;
            }
            let now_ms = self.clock.now_ms();
            let session_id = self.session(&mut state, now_ms).id.clone();
            IngestPayload {
                session_id,
                events: state.queue.drain_all(),
            }
        };

        let events = payload.events.len();
        match self.deliver(&payload) {
            Ok(channel) => {
                debug!(session_id = %payload.session_id, events, ?channel, "flushed batch");
                FlushOutcome::Delivered { events, channel }
            }
            Err(e) => {
                warn!(
                    session_id = %payload.session_id,
                    events,
                    error = %e,
                    "delivery failed; batch re-queued"
                );
                self.state.lock().queue.requeue_front(payload.events);
                FlushOutcome::Requeued { events }
            }
        }
    }

    fn deliver(&self, payload: &IngestPayload) -> Result<DeliveryChannel, DeliveryError> {
        let body = serde_json::to_string(payload)?;
        transport::deliver(self.transport.as_ref(), &self.config.endpoint, &body)
    }
}

/// Client-side interaction collector.
///
/// Cheap to clone; clones share one queue, once registry and session.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

impl Collector {
    /// Start building a collector that delivers through `transport`
    pub fn builder(transport: impl Transport + 'static) -> CollectorBuilder {
        CollectorBuilder::new(transport)
    }

    /// Initialize the collector for a page view.
    ///
    /// Only the first call has any effect: it resolves the session, emits
    /// `session_start` and registers hidden/unload flush hooks with `lifecycle`.
    /// Returns whether this call performed the initialization.
    pub fn initialize(&self, page: &PageContext, lifecycle: &dyn LifecycleHost) -> bool {
        let now_ms = self.inner.clock.now_ms();
        let (session_id, restored) = {
            let mut state = self.inner.state.lock();
            if state.initialized {
                return false;
            }
            state.initialized = true;
            let session = self.inner.session(&mut state, now_ms);
            (session.id.clone(), session.restored)
        };

        for event in [LifecycleEvent::Hidden, LifecycleEvent::Unload] {
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            lifecycle.register(
                event,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.flush();
                    }
                }),
            );
        }

        let mut properties = Properties::new();
        properties.insert(
            "device_class".to_string(),
            Value::from(page.device_class.as_str()),
        );
        properties.insert(
            "referrer".to_string(),
            page.referrer.clone().map_or(Value::Null, Value::String),
        );
        properties.insert(
            "landing_page".to_string(),
            Value::from(page.landing_page.as_str()),
        );
        properties.insert("is_restored_session".to_string(), Value::Bool(restored));
        self.track(
            EventName::SessionStart.as_str(),
            properties,
            TrackOptions::once(),
        );

        info!(
            session_id = %session_id,
            restored,
            device_class = page.device_class.as_str(),
            "collector initialized"
        );
        true
    }

    /// Record an event.
    ///
    /// Returns false if the event was suppressed by once semantics.
    pub fn track(&self, name: &str, properties: Properties, options: TrackOptions) -> bool {
        let now_ms = self.inner.clock.now_ms();
        let (flush_now, arm_timer) = {
            let mut state = self.inner.state.lock();
            if options.once && !state.once.claim(name) {
                return false;
            }

            let elapsed_ms = self.inner.session(&mut state, now_ms).elapsed_ms(now_ms);
            let mut properties = properties;
            properties.insert(ELAPSED_MS_KEY.to_string(), Value::from(elapsed_ms));
            state.queue.push(Event {
                name: name.to_string(),
                timestamp: now_ms,
                properties,
            });

            if state.queue.len() >= self.inner.config.flush_threshold {
                (true, false)
            } else if state.timer_pending {
                (false, false)
            } else {
                state.timer_pending = true;
                (false, true)
            }
        };

        if flush_now {
            self.inner.flush();
        } else if arm_timer {
            self.arm_timer();
        }
        true
    }

    fn arm_timer(&self) {
        let weak = Arc::downgrade(&self.inner);
        let scheduled = self.inner.timer.schedule(
            self.inner.config.flush_interval(),
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.state.lock().timer_pending = false;
                inner.flush();
            }),
        );

        if let Err(e) = scheduled {
            // The callback will never run; let the next track() try again.
            warn!(error = %e, "failed to arm flush timer");
            self.inner.state.lock().timer_pending = false;
        }
    }

    /// Deliver everything queued now
    pub fn flush(&self) -> FlushOutcome {
        self.inner.flush()
    }

    /// Record a card reveal, plus `spread_ready` the first time two or more
    /// cards are revealed
    pub fn track_card_flip(&self, card_index: u32, revealed_count: u32, spread_slug: &str) {
        let mut properties = Properties::new();
        properties.insert("card_index".to_string(), Value::from(card_index));
        properties.insert("cards_revealed_count".to_string(), Value::from(revealed_count));
        properties.insert("spread_slug".to_string(), Value::from(spread_slug));
        self.track(
            EventName::CardFlip.as_str(),
            properties,
            TrackOptions::default(),
        );

        if revealed_count >= 2 {
            let mut properties = Properties::new();
            properties.insert("spread_slug".to_string(), Value::from(spread_slug));
            properties.insert("cards_revealed_count".to_string(), Value::from(revealed_count));
            self.track(
                EventName::SpreadReady.as_str(),
                properties,
                TrackOptions::once(),
            );
        }
    }

    pub fn track_read_spread_click(&self, spread_slug: &str) {
        self.track_with_slug(EventName::ReadSpreadClick, spread_slug);
    }

    pub fn track_talk_click(&self, spread_slug: &str) {
        self.track_with_slug(EventName::TalkClick, spread_slug);
    }

    pub fn track_card_detail_click(&self, card_slug: &str, position: u32) {
        let mut properties = Properties::new();
        properties.insert("card_slug".to_string(), Value::from(card_slug));
        properties.insert("position".to_string(), Value::from(position));
        self.track(
            EventName::CardDetailClick.as_str(),
            properties,
            TrackOptions::default(),
        );
    }

    fn track_with_slug(&self, name: EventName, spread_slug: &str) {
        let mut properties = Properties::new();
        properties.insert("spread_slug".to_string(), Value::from(spread_slug));
        self.track(name.as_str(), properties, TrackOptions::default());
    }

    /// Snapshot of queued events, oldest first
    pub fn pending_events(&self) -> Vec<Event> {
        self.inner.state.lock().queue.iter().cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Current session token, resolving the session if needed
    pub fn session_id(&self) -> String {
        let now_ms = self.inner.clock.now_ms();
        let mut state = self.inner.state.lock();
        self.inner.session(&mut state, now_ms).id.clone()
    }

    /// Whether a once event with this name has been emitted
    pub fn has_fired(&self, name: &str) -> bool {
        self.inner.state.lock().once.contains(name)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }
}

/// Builder for [`Collector`]
pub struct CollectorBuilder {
    config: CollectorConfig,
    transport: Box<dyn Transport>,
    storage: Box<dyn SessionStorage>,
    timer: Box<dyn Timer>,
    clock: Box<dyn Clock>,
}

impl CollectorBuilder {
    fn new(transport: impl Transport + 'static) -> Self {
        Self {
            config: CollectorConfig::default(),
            transport: Box::new(transport),
            storage: Box::new(MemoryStorage::new()),
            timer: Box::new(ThreadTimer),
            clock: Box::new(SystemClock),
        }
    }

    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: impl SessionStorage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Box::new(timer);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn build(self) -> Collector {
        Collector {
            inner: Arc::new(Inner {
                config: self.config,
                state: Mutex::new(CollectorState::default()),
                storage: self.storage,
                transport: self.transport,
                timer: self.timer,
                clock: self.clock,
            }),
        }
    }
}
