//! Page lifecycle hooks
//!
//! The collector asks its host to call back when the page is hidden or about to
//! unload, and flushes immediately on either.

use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle transitions that demand an immediate flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The page became hidden (tab switch, app backgrounded)
    Hidden,
    /// The page is unloading
    Unload,
}

pub type LifecycleHook = Box<dyn Fn() + Send + Sync + 'static>;

/// Registration point for lifecycle hooks
pub trait LifecycleHost {
    fn register(&self, event: LifecycleEvent, hook: LifecycleHook);
}

/// A host that fires hooks when told to.
///
/// Native hosts forward their own suspend/shutdown notifications through
/// [`ManualLifecycle::emit`].
#[derive(Default)]
pub struct ManualLifecycle {
    hooks: Mutex<Vec<(LifecycleEvent, Arc<dyn Fn() + Send + Sync>)>>,
}

impl ManualLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every hook registered for `event`, returning how many ran
    pub fn emit(&self, event: LifecycleEvent) -> usize {
        // Hooks may flush and block on delivery; never hold the lock while they run.
        let hooks: Vec<_> = self
            .hooks
            .lock()
            .iter()
            .filter(|(registered, _)| *registered == event)
            .map(|(_, hook)| Arc::clone(hook))
            .collect();

        for hook in &hooks {
            hook();
        }
        hooks.len()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }
}

impl LifecycleHost for ManualLifecycle {
    fn register(&self, event: LifecycleEvent, hook: LifecycleHook) {
        self.hooks.lock().push((event, Arc::from(hook)));
    }
}
