use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::Subscription;

use super::ChatMessage;

/// Called with the entire ordered message log on every upstream change.
pub type SnapshotCallback = Arc<dyn Fn(Vec<ChatMessage>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The upstream send call failed
    #[error("Message could not be delivered: {0}")]
    SendFailed(String),
}

/// The upstream chat log of a broadcast.
///
/// The upstream only exposes "the current total log", so subscribers always
/// receive full snapshots, never deltas.
#[async_trait]
pub trait ChatSource: Send + Sync + 'static {
    /// Subscribes to the message log of a broadcaster. The callback fires
    /// with the current log immediately, and again on every change.
    fn subscribe(&self, broadcaster_id: &str, on_snapshot: SnapshotCallback) -> Subscription;

    /// Appends a message to the broadcaster's log.
    async fn send(
        &self,
        broadcaster_id: &str,
        user_id: &str,
        display_name: &str,
        text: &str,
    ) -> Result<(), ChatError>;
}
