//! Request hooks: observe the latency and outcome of every API call.
//!
//! Listeners run synchronously, in registration order, after the response
//! has been unwrapped and before the result reaches the caller. They cannot
//! change the outcome: a panicking listener is logged and skipped.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, warn};

/// Which side of a call a listener observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Fulfilled,
    Failed,
}

/// Passed to listeners once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    /// Request path, e.g. `/publish`.
    pub path: String,
    pub duration: Duration,
    /// Error description for failed calls.
    pub error: Option<String>,
}

impl RequestEvent {
    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

pub type Listener = Arc<dyn Fn(&RequestEvent) + Send + Sync>;

/// Handle returned on registration, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer with one callback per outcome.
pub trait RequestObserver: Send + Sync {
    fn on_fulfilled(&self, _event: &RequestEvent) {}

    fn on_failed(&self, _event: &RequestEvent) {}
}

/// Registry of listeners, keyed by event.
pub struct Hooks {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<HookEvent, Vec<(ListenerId, Listener)>>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Register a listener for a specific event.
    pub fn register<F>(&self, event: HookEvent, listener: F) -> ListenerId
    where
        F: Fn(&RequestEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn on_fulfilled<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RequestEvent) + Send + Sync + 'static,
    {
        self.register(HookEvent::Fulfilled, listener)
    }

    pub fn on_failed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RequestEvent) + Send + Sync + 'static,
    {
        self.register(HookEvent::Failed, listener)
    }

    /// Register both callbacks of an observer.
    pub fn observe(&self, observer: Arc<dyn RequestObserver>) -> (ListenerId, ListenerId) {
        let fulfilled = observer.clone();
        let failed = observer;
        (
            self.on_fulfilled(move |event| fulfilled.on_fulfilled(event)),
            self.on_failed(move |event| failed.on_failed(event)),
        )
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for chain in listeners.values_mut() {
            if let Some(pos) = chain.iter().position(|(lid, _)| *lid == id) {
                chain.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of listeners registered for an event.
    pub fn count(&self, event: HookEvent) -> usize {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.get(&event).map_or(0, |v| v.len())
    }

    /// Invoke every listener for `event` in registration order.
    pub fn fire(&self, event: HookEvent, info: &RequestEvent) {
        // Snapshot so listeners may register or remove without deadlocking.
        let chain: Vec<Listener> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match listeners.get(&event) {
                Some(chain) => chain.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };

        for listener in chain {
            if catch_unwind(AssertUnwindSafe(|| listener(info))).is_err() {
                warn!(event = ?event, path = %info.path, "Hook listener panicked, continuing");
            }
        }
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every call through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_fulfilled(&self, event: &RequestEvent) {
        debug!(path = %event.path, elapsed_ms = event.duration_ms() as u64, "API request fulfilled");
    }

    fn on_failed(&self, event: &RequestEvent) {
        warn!(
            path = %event.path,
            elapsed_ms = event.duration_ms() as u64,
            error = event.error.as_deref().unwrap_or("unknown"),
            "API request failed"
        );
    }
}
