//! Time sources for the collector
//!
//! Both the wall clock and the debounce timer are injected so hosts (and tests)
//! control when scheduled flushes run.

use chrono::Utc;
use std::io;
use std::thread;
use std::time::Duration;

/// Deferred work handed to a [`Timer`]
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// One-shot delayed execution
pub trait Timer: Send + Sync {
    /// Run `callback` once after `delay`. An error means it will never run.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> io::Result<()>;
}

/// Runs each callback on its own sleeping thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimer;

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> io::Result<()> {
        thread::Builder::new()
            .name("pulse-flush-timer".to_string())
            .spawn(move || {
                thread::sleep(delay);
                callback();
            })
            .map(|_| ())
    }
}

/// Wall clock in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_thread_timer_fires() {
        let (tx, rx) = mpsc::channel();
        ThreadTimer
            .schedule(
                Duration::from_millis(5),
                Box::new(move || {
                    tx.send(()).unwrap();
                }),
            )
            .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_system_clock_is_epoch_ms() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
