//! Batch delivery
//!
//! The network itself is the host's concern. A [`Transport`] exposes two
//! primitives: a navigation-safe fire-and-forget beacon, and a keep-alive
//! request used when no beacon is available. Responses are never inspected;
//! only an `Err` counts as failure.

use crate::error::DeliveryError;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which primitive carried a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Beacon,
    KeepAlive,
}

/// Host-provided delivery primitives
pub trait Transport: Send + Sync {
    /// Whether [`Transport::send_beacon`] may be used
    fn beacon_available(&self) -> bool {
        false
    }

    /// Queue `body` for delivery even if the page is going away
    fn send_beacon(&self, _endpoint: &str, _body: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::BeaconRejected)
    }

    /// Keep-alive flagged request
    fn send_keepalive(&self, endpoint: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Hand `body` to the best available channel
pub fn deliver(
    transport: &dyn Transport,
    endpoint: &str,
    body: &str,
) -> Result<DeliveryChannel, DeliveryError> {
    if transport.beacon_available() {
        transport.send_beacon(endpoint, body)?;
        Ok(DeliveryChannel::Beacon)
    } else {
        transport.send_keepalive(endpoint, body)?;
        Ok(DeliveryChannel::KeepAlive)
    }
}

/// Appends every batch as one NDJSON line to a spool file.
///
/// Appends survive the collector going away, so the spool doubles as the
/// beacon channel. The file is what `pulse ingest` reads.
pub struct SpoolTransport {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl SpoolTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, body: &str) -> Result<(), DeliveryError> {
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| DeliveryError::Network(format!("{}: {}", self.path.display(), e)))?;
            *guard = Some(file);
        }

        let Some(file) = guard.as_mut() else {
            return Err(DeliveryError::Network("spool file unavailable".to_string()));
        };
        let result = writeln!(file, "{body}").and_then(|_| file.flush());
        if let Err(e) = result {
            // Reopen on the next batch.
            *guard = None;
            return Err(DeliveryError::Network(e.to_string()));
        }
        Ok(())
    }
}

impl Transport for SpoolTransport {
    fn beacon_available(&self) -> bool {
        true
    }

    fn send_beacon(&self, _endpoint: &str, body: &str) -> Result<(), DeliveryError> {
        self.append(body)
    }

    fn send_keepalive(&self, _endpoint: &str, body: &str) -> Result<(), DeliveryError> {
        self.append(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct KeepAliveOnly {
        sent: Mutex<Vec<String>>,
    }

    impl Transport for KeepAliveOnly {
        fn send_keepalive(&self, _endpoint: &str, body: &str) -> Result<(), DeliveryError> {
            self.sent.lock().push(body.to_string());
            Ok(())
        }
    }

    fn temp_spool() -> PathBuf {
        std::env::temp_dir().join(format!("pulse-spool-{}.ndjson", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_falls_back_to_keepalive() {
        let transport = KeepAliveOnly {
            sent: Mutex::new(Vec::new()),
        };
        let channel = deliver(&transport, "/ingest", "{}").unwrap();
        assert_eq!(channel, DeliveryChannel::KeepAlive);
        assert_eq!(transport.sent.lock().len(), 1);
    }

    #[test]
    fn test_spool_appends_lines() {
        let path = temp_spool();
        let spool = SpoolTransport::new(&path);

        assert_eq!(deliver(&spool, "/ingest", "{\"a\":1}").unwrap(), DeliveryChannel::Beacon);
        deliver(&spool, "/ingest", "{\"b\":2}").unwrap();

        let contents = fs::read_to_string(spool.path()).unwrap();
        assert_eq!(contents, "{\"a\":1}\n{\"b\":2}\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_spool_open_failure_is_delivery_error() {
        let path = std::env::temp_dir()
            .join(format!("missing-{}", uuid::Uuid::new_v4()))
            .join("spool.ndjson");
        let spool = SpoolTransport::new(path);
        assert!(matches!(
            deliver(&spool, "/ingest", "{}"),
            Err(DeliveryError::Network(_))
        ));
    }
}
