mod session;

use std::sync::Arc;

use thiserror::Error;

pub use session::*;

use crate::{CloseReason, SessionContext};

/// Everything needed to open a live session as a viewer.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub broadcaster_id: String,
    /// An opaque reference the video backend knows how to resolve.
    pub video_ref: String,
    pub title: String,
    pub description: String,
    /// The viewer watching, used for chat sends and telemetry.
    pub viewer_id: String,
    pub viewer_name: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// A session for this broadcaster is already open
    #[error("A session for this broadcaster is already open")]
    AlreadyOpen,
    /// The session has already been torn down
    #[error("Session is closed")]
    Closed,
}

pub struct SessionManager {
    context: SessionContext,
}

impl SessionManager {
    pub fn new(context: &SessionContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Opens a session for a broadcaster: wires chat and presence, starts
    /// playback, and reports the join.
    pub async fn open(&self, data: SessionData) -> Result<Arc<LiveSession>, SessionError> {
        if self.context.sessions.contains_key(&data.broadcaster_id) {
            return Err(SessionError::AlreadyOpen);
        }

        let broadcaster_id = data.broadcaster_id.clone();
        let session = Arc::new(LiveSession::new(&self.context, data));

        // The session must be findable before anything can end it, so it is
        // stored before the upstream subscriptions go live.
        self.context
            .sessions
            .insert(broadcaster_id, session.clone());

        session.start().await;

        Ok(session)
    }

    /// Returns the open session for a broadcaster, if any.
    pub fn get(&self, broadcaster_id: &str) -> Option<Arc<LiveSession>> {
        self.context
            .sessions
            .get(broadcaster_id)
            .map(|session| session.value().clone())
    }

    /// All currently open sessions.
    pub fn list_all(&self) -> Vec<Arc<LiveSession>> {
        self.context
            .sessions
            .iter()
            .map(|session| session.value().clone())
            .collect()
    }

    /// Closes every open session, as a viewer exit.
    pub fn close_all(&self) {
        for session in self.list_all() {
            session.close(CloseReason::UserExit);
        }
    }
}
