//! Session identity
//!
//! A session is one tab lifetime. Its token and start time live in tab-scoped
//! storage, so a reload restores them and a new tab starts fresh.

use crate::config::CollectorConfig;
use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tab-scoped key/value storage (survives reloads, not new tabs)
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Resolved session identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque alphanumeric token
    pub id: String,
    /// Session start, epoch milliseconds; never changes once set
    pub started_at: i64,
    /// Whether the token already existed in storage when it was resolved
    pub restored: bool,
}

impl Session {
    /// Milliseconds between session start and `now_ms`
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.started_at
    }

    /// Read the session from storage, creating and persisting it if absent.
    ///
    /// Storage failures fall back to a fresh in-memory session; telemetry must
    /// keep working without persistence.
    pub fn load_or_create(
        storage: &dyn SessionStorage,
        config: &CollectorConfig,
        now_ms: i64,
    ) -> Session {
        match Self::load(storage, config, now_ms) {
            Ok(Some(session)) => {
                debug!(session_id = %session.id, "restored session");
                session
            }
            Ok(None) => {
                let session = Self::fresh(now_ms);
                if let Err(e) = Self::persist(storage, config, &session) {
                    warn!(error = %e, "failed to persist session; continuing in memory");
                }
                debug!(session_id = %session.id, "created session");
                session
            }
            Err(e) => {
                warn!(error = %e, "session storage unavailable; using in-memory session");
                Self::fresh(now_ms)
            }
        }
    }

    fn load(
        storage: &dyn SessionStorage,
        config: &CollectorConfig,
        now_ms: i64,
    ) -> Result<Option<Session>, StorageError> {
        let Some(id) = storage.get(&config.session_key)? else {
            return Ok(None);
        };

        let started_at = match storage.get(&config.session_start_key)? {
            Some(raw) => match raw.parse::<i64>() {
                Ok(started_at) => started_at,
                Err(_) => {
                    let e = StorageError::Corrupt {
                        key: config.session_start_key.clone(),
                        value: raw,
                    };
                    warn!(error = %e, "resetting session start");
                    Self::reset_start(storage, config, now_ms)
                }
            },
            None => Self::reset_start(storage, config, now_ms),
        };

        Ok(Some(Session {
            id,
            started_at,
            restored: true,
        }))
    }

    fn reset_start(storage: &dyn SessionStorage, config: &CollectorConfig, now_ms: i64) -> i64 {
        if let Err(e) = storage.set(&config.session_start_key, &now_ms.to_string()) {
            warn!(error = %e, "failed to persist session start");
        }
        now_ms
    }

    fn fresh(now_ms: i64) -> Session {
        Session {
            id: new_session_token(),
            started_at: now_ms,
            restored: false,
        }
    }

    fn persist(
        storage: &dyn SessionStorage,
        config: &CollectorConfig,
        session: &Session,
    ) -> Result<(), StorageError> {
        storage.set(&config.session_key, &session.id)?;
        storage.set(&config.session_start_key, &session.started_at.to_string())
    }
}

/// 32 random hex characters
pub fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStorage;

    impl SessionStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_token_shape() {
        let token = new_session_token();
        assert!(token.len() >= 12);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, new_session_token());
    }

    #[test]
    fn test_create_then_restore() {
        let storage = MemoryStorage::new();
        let config = CollectorConfig::default();

        let first = Session::load_or_create(&storage, &config, 1_000);
        assert!(!first.restored);
        assert_eq!(first.started_at, 1_000);

        // Reload: same tab storage, later clock.
        let second = Session::load_or_create(&storage, &config, 9_000);
        assert!(second.restored);
        assert_eq!(second.id, first.id);
        assert_eq!(second.started_at, 1_000);
        assert_eq!(second.elapsed_ms(9_000), 8_000);
    }

    #[test]
    fn test_corrupt_start_is_reset() {
        let storage = MemoryStorage::new();
        let config = CollectorConfig::default();
        storage.set(&config.session_key, "abcdefghijkl").unwrap();
        storage.set(&config.session_start_key, "yesterday").unwrap();

        let session = Session::load_or_create(&storage, &config, 42);
        assert!(session.restored);
        assert_eq!(session.id, "abcdefghijkl");
        assert_eq!(session.started_at, 42);
        assert_eq!(
            storage.get(&config.session_start_key).unwrap().as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_storage_failure_falls_back_to_memory() {
        let config = CollectorConfig::default();
        let session = Session::load_or_create(&BrokenStorage, &config, 7);
        assert!(!session.restored);
        assert_eq!(session.started_at, 7);
        assert!(!session.id.is_empty());
    }
}
