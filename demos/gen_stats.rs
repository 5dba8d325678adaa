//! Simulate a handful of spread visits and print the resulting stats report

use std::sync::Arc;

use chrono::Utc;
use spread_pulse::collector::{
    Collector, DeviceClass, LifecycleEvent, ManualLifecycle, PageContext, Transport,
};
use spread_pulse::schema::IngestPayload;
use spread_pulse::stats::{InMemoryEventStore, StatsProcessor, StatsWindow};
use spread_pulse::DeliveryError;

/// Delivers batches straight into an in-process event store
struct StoreTransport(Arc<StatsProcessor<InMemoryEventStore>>);

impl Transport for StoreTransport {
    fn send_keepalive(&self, _endpoint: &str, body: &str) -> Result<(), DeliveryError> {
        let payload: IngestPayload = serde_json::from_str(body)?;
        self.0
            .store()
            .ingest(&payload, Utc::now())
            .map(|_| ())
            .map_err(|e| DeliveryError::Network(e.to_string()))
    }
}

fn visit(processor: &Arc<StatsProcessor<InMemoryEventStore>>, device: DeviceClass, flips: u32, reads: bool) {
    let collector = Collector::builder(StoreTransport(Arc::clone(processor))).build();
    let lifecycle = ManualLifecycle::new();
    let page = PageContext::new("/spreads/past-present-future")
        .with_device_class(device)
        .with_referrer("https://search.example/");

    collector.initialize(&page, &lifecycle);
    for revealed in 1..=flips {
        collector.track_card_flip(revealed - 1, revealed, "past-present-future");
    }
    if reads {
        collector.track_read_spread_click("past-present-future");
    }
    lifecycle.emit(LifecycleEvent::Unload);
}

fn main() {
    let processor: Arc<StatsProcessor<InMemoryEventStore>> = Arc::new(StatsProcessor::default());

    visit(&processor, DeviceClass::Mobile, 0, false);
    visit(&processor, DeviceClass::Mobile, 1, false);
    visit(&processor, DeviceClass::Desktop, 2, false);
    visit(&processor, DeviceClass::Desktop, 3, true);
    visit(&processor, DeviceClass::Mobile, 3, true);

    match processor.report_json(StatsWindow::Week, Utc::now()) {
        Ok(report) => println!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
