use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::Subscription;

/// One sample of the broadcaster's liveness signal.
///
/// Not an entity with identity, just a time series. The upstream re-delivers
/// it on every write, including redundant repeats of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSignal {
    pub is_live: bool,
    /// When the broadcaster's heartbeat writer last checked in. `None` means
    /// the presence record itself is gone.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

/// Called on every upstream presence write.
pub type PresenceCallback = Arc<dyn Fn(PresenceSignal) + Send + Sync>;

/// The upstream liveness signal of a broadcast.
pub trait PresenceSource: Send + Sync + 'static {
    /// Subscribes to a broadcaster's presence signal. The callback fires
    /// with the current signal immediately if one exists, and again on every
    /// upstream write.
    fn subscribe(&self, broadcaster_id: &str, on_update: PresenceCallback) -> Subscription;
}
