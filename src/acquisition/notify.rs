// src/acquisition/notify.rs
//! Data-ready broadcast to any number of subscribers
//!
//! A notice is a hint to re-query, not a queue of pulses. Each subscriber
//! holds at most one undelivered notice; later pulses are dropped for it
//! until it reads, and the history always has the newest data.

use crate::acquisition::record::PulseNotice;
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Fan-out of pulse notices; dropped receivers are pruned on the next send
#[derive(Debug, Default)]
pub struct DataReady {
    subscribers: Mutex<Vec<Sender<PulseNotice>>>,
}

impl DataReady {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<PulseNotice> {
        let (tx, rx) = bounded(1);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `notice` to every live subscriber without blocking
    pub fn publish(&self, notice: PulseNotice) {
        self.subscribers
            .lock()
            .retain(|tx| !matches!(tx.try_send(notice), Err(TrySendError::Disconnected(_))));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_is_notified() {
        let ready = DataReady::new();
        let a = ready.subscribe();
        let b = ready.subscribe();

        let notice = PulseNotice { sequence: 3, timestamp: 99 };
        ready.publish(notice);

        assert_eq!(a.try_recv(), Ok(notice));
        assert_eq!(b.try_recv(), Ok(notice));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let ready = DataReady::new();
        let kept = ready.subscribe();
        drop(ready.subscribe());
        assert_eq!(ready.subscriber_count(), 2);

        ready.publish(PulseNotice { sequence: 0, timestamp: 0 });
        assert_eq!(ready.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_idle_subscriber_holds_one_notice() {
        let ready = DataReady::new();
        let idle = ready.subscribe();

        for sequence in 0..500 {
            ready.publish(PulseNotice { sequence, timestamp: sequence });
        }

        assert_eq!(idle.len(), 1);
        assert_eq!(ready.subscriber_count(), 1);
        assert_eq!(idle.try_recv().map(|n| n.sequence), Ok(0));
        assert!(idle.try_recv().is_err());

        ready.publish(PulseNotice { sequence: 500, timestamp: 500 });
        assert_eq!(idle.try_recv().map(|n| n.sequence), Ok(500));
    }
}
