use crossbeam::channel::{Receiver, Sender};

use crate::{ChatMessage, PlaybackState};

pub type EventSender = Sender<CoreEvent>;
pub type EventReceiver = Receiver<CoreEvent>;

/// Describes the events that can be emitted by the client subsystems.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A playback controller's reported state has changed.
    PlaybackStateUpdate {
        broadcaster_id: String,
        new_state: PlaybackState,
    },
    /// A playback controller's position has changed.
    PlaybackTimeUpdate {
        broadcaster_id: String,
        /// The current position of the player, in seconds.
        position: f32,
    },
    /// The reconciled chat list changed.
    ChatListUpdate {
        broadcaster_id: String,
        /// The full list, in display order.
        messages: Vec<ChatMessage>,
    },
    /// An optimistic chat message could not be delivered.
    ChatSendFailed {
        broadcaster_id: String,
        /// The id of the optimistic entry that was rolled back.
        pending_id: String,
        error: String,
    },
    /// The presence monitor decided the broadcast is over.
    SessionEnded { broadcaster_id: String },
}
