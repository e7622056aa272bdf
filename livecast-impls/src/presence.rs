use std::sync::Arc;

use chrono::Utc;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use parking_lot::Mutex;

use livecast_core::{PresenceCallback, PresenceSignal, PresenceSource, Subscription};

/// An in-process presence record store, re-delivering on every write the way
/// the real upstream does, redundant repeats included.
#[derive(Default)]
pub struct MemoryPresenceSource {
    signals: DashMap<String, PresenceSignal>,
    subscribers: Arc<Mutex<Vec<PresenceSubscriber>>>,
    next_subscriber_id: AtomicCell<u64>,
}

struct PresenceSubscriber {
    id: u64,
    broadcaster_id: String,
    callback: PresenceCallback,
}

impl MemoryPresenceSource {
    pub fn new() -> Self {
        Default::default()
    }

    /// Writes a broadcaster's presence record and delivers it, even if the
    /// value did not change.
    pub fn set(&self, broadcaster_id: &str, signal: PresenceSignal) {
        self.signals.insert(broadcaster_id.to_string(), signal);
        self.notify(broadcaster_id, signal);
    }

    /// Writes a fresh live heartbeat for a broadcaster.
    pub fn heartbeat(&self, broadcaster_id: &str) {
        self.set(
            broadcaster_id,
            PresenceSignal {
                is_live: true,
                last_heartbeat_at: Some(Utc::now()),
            },
        );
    }

    /// Removes a broadcaster's presence record entirely.
    pub fn delete(&self, broadcaster_id: &str) {
        self.signals.remove(broadcaster_id);

        self.notify(
            broadcaster_id,
            PresenceSignal {
                is_live: false,
                last_heartbeat_at: None,
            },
        );
    }

    fn notify(&self, broadcaster_id: &str, signal: PresenceSignal) {
        // Callbacks run outside the lock, since they may unsubscribe.
        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|subscriber| subscriber.broadcaster_id == broadcaster_id)
            .map(|subscriber| subscriber.callback.clone())
            .collect();

        for callback in callbacks {
            callback(signal)
        }
    }
}

impl PresenceSource for MemoryPresenceSource {
    fn subscribe(&self, broadcaster_id: &str, on_update: PresenceCallback) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1);

        self.subscribers.lock().push(PresenceSubscriber {
            id,
            broadcaster_id: broadcaster_id.to_string(),
            callback: on_update.clone(),
        });

        if let Some(signal) = self.signals.get(broadcaster_id) {
            on_update(*signal)
        }

        let subscribers = self.subscribers.clone();

        Subscription::new(move || {
            subscribers.lock().retain(|subscriber| subscriber.id != id);
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_redundant_writes_are_redelivered() {
        let source = MemoryPresenceSource::new();
        let updates: Arc<Mutex<Vec<PresenceSignal>>> = Default::default();

        let sink = updates.clone();
        let _subscription =
            source.subscribe("b1", Arc::new(move |signal| sink.lock().push(signal)));

        let signal = PresenceSignal {
            is_live: true,
            last_heartbeat_at: Some(Utc::now()),
        };

        source.set("b1", signal);
        source.set("b1", signal);

        assert_eq!(updates.lock().len(), 2, "repeats are not debounced here");
    }

    #[test]
    fn test_subscribe_delivers_the_current_record() {
        let source = MemoryPresenceSource::new();
        source.heartbeat("b1");

        let updates: Arc<Mutex<Vec<PresenceSignal>>> = Default::default();

        let sink = updates.clone();
        let _subscription =
            source.subscribe("b1", Arc::new(move |signal| sink.lock().push(signal)));

        assert_eq!(updates.lock().len(), 1);
        assert!(updates.lock()[0].is_live);
    }

    #[test]
    fn test_delete_delivers_an_empty_record() {
        let source = MemoryPresenceSource::new();
        source.heartbeat("b1");

        let updates: Arc<Mutex<Vec<PresenceSignal>>> = Default::default();

        let sink = updates.clone();
        let _subscription =
            source.subscribe("b1", Arc::new(move |signal| sink.lock().push(signal)));

        source.delete("b1");

        let last = *updates.lock().last().unwrap();

        assert!(!last.is_live);
        assert!(last.last_heartbeat_at.is_none());
    }
}
