// src/acquisition/event.rs
//! Binary pulse event between interrupt context and the worker

use crossbeam::sync::{Parker, Unparker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Create a connected signal/waiter pair
///
/// The event is binary: any number of signals before the next wait are
/// consumed by that one wait. Signalling never blocks or allocates.
pub fn pulse_event() -> (EventSignal, EventWaiter) {
    let parker = Parker::new();
    let pending = Arc::new(AtomicBool::new(false));
    let signal = EventSignal {
        unparker: parker.unparker().clone(),
        pending: Arc::clone(&pending),
    };
    (signal, EventWaiter { parker, pending })
}

/// Sending half, safe to use from interrupt context
#[derive(Clone)]
pub struct EventSignal {
    unparker: Unparker,
    pending: Arc<AtomicBool>,
}

impl EventSignal {
    /// Set the event; returns `false` if it was already set
    pub fn signal(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.unparker.unpark();
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for EventSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSignal")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Receiving half, owned by the worker thread
pub struct EventWaiter {
    parker: Parker,
    pending: Arc<AtomicBool>,
}

impl EventWaiter {
    /// Block until the event is set, then clear it
    pub fn wait(&self) {
        // Stale park tokens only cause an extra loop
        while !self.pending.swap(false, Ordering::AcqRel) {
            self.parker.park();
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`
    ///
    /// Returns `true` if the event was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.pending.swap(false, Ordering::AcqRel) {
                return true;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            self.parker.park_timeout(deadline - now);
        }
    }
}

impl std::fmt::Debug for EventWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWaiter")
            .field("pending", &self.pending.load(Ordering::Acquire))
            .finish()
    }
}
