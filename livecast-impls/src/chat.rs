use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use parking_lot::Mutex;

use livecast_core::{ChatError, ChatMessage, ChatSource, SnapshotCallback, Subscription};

/// An in-process chat log, delivering the full snapshot to subscribers on
/// every change the way the real upstream does.
#[derive(Default)]
pub struct MemoryChatSource {
    logs: DashMap<String, Vec<ChatMessage>>,
    subscribers: Arc<Mutex<Vec<ChatSubscriber>>>,
    next_subscriber_id: AtomicCell<u64>,
    next_message_id: AtomicCell<u64>,
    fail_next_send: AtomicCell<bool>,
}

struct ChatSubscriber {
    id: u64,
    broadcaster_id: String,
    callback: SnapshotCallback,
}

impl MemoryChatSource {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a message to a broadcaster's log, as if another viewer sent
    /// it, and re-delivers the snapshot.
    pub fn push(&self, broadcaster_id: &str, user_id: &str, display_name: &str, text: &str) {
        let message = ChatMessage {
            message_id: format!("m{}", self.next_message_id.fetch_add(1) + 1),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };

        self.logs
            .entry(broadcaster_id.to_string())
            .or_default()
            .push(message);

        self.notify(broadcaster_id);
    }

    /// Truncates a broadcaster's log and re-delivers the now shorter
    /// snapshot, the way an upstream restart does.
    pub fn clear(&self, broadcaster_id: &str) {
        if let Some(mut log) = self.logs.get_mut(broadcaster_id) {
            log.clear();
        }

        self.notify(broadcaster_id);
    }

    /// Makes the next `send` call fail.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true);
    }

    /// The current log of a broadcaster.
    pub fn snapshot(&self, broadcaster_id: &str) -> Vec<ChatMessage> {
        self.logs
            .get(broadcaster_id)
            .map(|log| log.value().clone())
            .unwrap_or_default()
    }

    fn notify(&self, broadcaster_id: &str) {
        let snapshot = self.snapshot(broadcaster_id);

        // Callbacks run outside the lock, since they may unsubscribe.
        let callbacks: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|subscriber| subscriber.broadcaster_id == broadcaster_id)
            .map(|subscriber| subscriber.callback.clone())
            .collect();

        for callback in callbacks {
            callback(snapshot.clone())
        }
    }
}

#[async_trait]
impl ChatSource for MemoryChatSource {
    fn subscribe(&self, broadcaster_id: &str, on_snapshot: SnapshotCallback) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1);

        self.subscribers.lock().push(ChatSubscriber {
            id,
            broadcaster_id: broadcaster_id.to_string(),
            callback: on_snapshot.clone(),
        });

        // The upstream fires with the current log right away.
        on_snapshot(self.snapshot(broadcaster_id));

        let subscribers = self.subscribers.clone();

        Subscription::new(move || {
            subscribers.lock().retain(|subscriber| subscriber.id != id);
        })
    }

    async fn send(
        &self,
        broadcaster_id: &str,
        user_id: &str,
        display_name: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        if self.fail_next_send.swap(false) {
            return Err(ChatError::SendFailed("connection refused".to_string()));
        }

        self.push(broadcaster_id, user_id, display_name, text);

        Ok(())
    }
}
