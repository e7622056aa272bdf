use std::time::Duration as StdDuration;

use chrono::Duration;

/// The configuration of the live session client.
///
/// Every policy constant lives here so embedders and tests can override them.
#[derive(Debug, Clone)]
pub struct Config {
    /// How many seconds a heartbeat may lag before an offline signal is final
    pub presence_stale_secs: i64,
    /// How close in time an optimistic message must be to a confirmed one to count as the same send
    pub chat_reconcile_window_ms: i64,
    /// How long to wait after issuing play before issuing unmute
    pub unmute_delay_ms: u64,
    /// How often playback progress is reported, in seconds
    pub progress_tick_secs: f32,
    /// The length of the random token in optimistic message ids
    pub pending_id_length: usize,
}

impl Config {
    /// Marks a message id as optimistic, so it can never collide with a server id.
    pub const PENDING_ID_PREFIX: &'static str = "pending-";

    /// How long a heartbeat may lag before an offline signal is final
    pub fn stale_after(&self) -> Duration {
        Duration::seconds(self.presence_stale_secs)
    }

    /// The window in which an optimistic message can match a confirmed one
    pub fn reconcile_window(&self) -> Duration {
        Duration::milliseconds(self.chat_reconcile_window_ms)
    }

    /// The delay between issuing play and issuing unmute
    pub fn unmute_delay(&self) -> StdDuration {
        StdDuration::from_millis(self.unmute_delay_ms)
    }

    /// How often the progress ticker fires
    pub fn progress_tick(&self) -> StdDuration {
        StdDuration::from_secs_f32(self.progress_tick_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Tolerates a heartbeat writer that briefly lags without ending the session
            presence_stale_secs: 15,
            // Server timestamps stay close to local ones, so a few seconds is plenty
            chat_reconcile_window_ms: 5000,
            // Long enough to let the play command commit first
            unmute_delay_ms: 100,
            progress_tick_secs: 1.0,
            pending_id_length: 12,
        }
    }
}
