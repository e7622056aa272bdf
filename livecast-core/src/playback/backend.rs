use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PlayerEvents;

/// The normalized state of the embedded player.
///
/// The backend owns this state. The controller only ever reports the last
/// value the backend pushed, it never asserts one of its own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is loaded, or the backend failed to initialize.
    #[default]
    Unstarted,
    /// Media is loaded but has not started playing yet.
    Cued,
    Buffering,
    Playing,
    Paused,
    /// The media itself ran out.
    Ended,
}

/// Events pushed by the player backend through [PlayerEvents].
#[derive(Debug, Clone)]
pub enum RawPlayerEvent {
    /// The backend finished initializing.
    Ready,
    /// The backend reports a new playback state.
    StateChange(PlaybackState),
    /// Something went wrong inside the backend.
    Error(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The player backend could not be initialized
    #[error("Player backend failed to initialize: {0}")]
    InitFailed(String),
}

/// Initialization options for a new player instance.
///
/// Browsers block unmuted autoplay, so the defaults are the only combination
/// that reliably starts playback without a gesture.
#[derive(Debug, Clone, Copy)]
pub struct PlayerInit {
    pub autoplay: bool,
    pub muted: bool,
}

impl Default for PlayerInit {
    fn default() -> Self {
        Self {
            autoplay: true,
            muted: true,
        }
    }
}

/// Implemented by the embedding video technology.
#[async_trait]
pub trait VideoBackend: Send + Sync + 'static {
    /// Creates a player for the given video reference.
    ///
    /// The backend must push its own callbacks through `events`, starting
    /// with [RawPlayerEvent::Ready] once the player is usable.
    async fn init_player(
        &self,
        video_ref: &str,
        init: PlayerInit,
        events: PlayerEvents,
    ) -> Result<Box<dyn PlayerHandle>, PlaybackError>;
}

/// A handle to one live player instance.
pub trait PlayerHandle: Send + Sync {
    fn play(&self);
    fn pause(&self);
    /// Seeks to the given position, in seconds.
    fn seek_to(&self, seconds: f32);
    fn mute(&self);
    fn unmute(&self);
    fn is_muted(&self) -> bool;
    fn current_state(&self) -> PlaybackState;
    /// The current position, in seconds.
    fn current_time(&self) -> f32;
    /// Releases the underlying player resource.
    fn destroy(&self);
}
