use crossbeam::channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use livecast_core::{ChatMessage, CoreEvent, PlaybackState};

pub type EventSender = Sender<SessionEvent>;
pub type EventReceiver = Receiver<SessionEvent>;

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The viewer left on their own.
    UserExit,
    /// The presence monitor decided the broadcast is over.
    SessionEnded,
}

/// Events surfaced to the UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The player's reported state changed.
    PlaybackStateChanged {
        broadcaster_id: String,
        new_state: PlaybackState,
    },
    /// The player's position changed.
    PlaybackTimeChanged {
        broadcaster_id: String,
        /// The current position of the player, in seconds.
        position: f32,
    },
    /// The reconciled chat list changed.
    ChatListChanged {
        broadcaster_id: String,
        messages: Vec<ChatMessage>,
    },
    /// An optimistic chat message could not be delivered.
    ChatSendFailed {
        broadcaster_id: String,
        pending_id: String,
        error: String,
    },
    /// The session was torn down. Emitted exactly once per session.
    SessionClosed {
        broadcaster_id: String,
        reason: CloseReason,
    },
}

impl SessionEvent {
    /// Converts a core event to a friendly session event.
    ///
    /// End-of-session detections map to `None`: the session turns those into
    /// teardown, which emits its own [SessionEvent::SessionClosed].
    pub fn from_core_event(event: CoreEvent) -> Option<SessionEvent> {
        match event {
            CoreEvent::PlaybackStateUpdate {
                broadcaster_id,
                new_state,
            } => Some(Self::PlaybackStateChanged {
                broadcaster_id,
                new_state,
            }),
            CoreEvent::PlaybackTimeUpdate {
                broadcaster_id,
                position,
            } => Some(Self::PlaybackTimeChanged {
                broadcaster_id,
                position,
            }),
            CoreEvent::ChatListUpdate {
                broadcaster_id,
                messages,
            } => Some(Self::ChatListChanged {
                broadcaster_id,
                messages,
            }),
            CoreEvent::ChatSendFailed {
                broadcaster_id,
                pending_id,
                error,
            } => Some(Self::ChatSendFailed {
                broadcaster_id,
                pending_id,
                error,
            }),
            CoreEvent::SessionEnded { .. } => None,
        }
    }
}
