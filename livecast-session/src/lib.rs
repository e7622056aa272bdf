use std::{sync::Arc, thread};

mod events;
mod session;

pub use events::*;
pub use session::*;

use crossbeam::channel::unbounded;
use dashmap::DashMap;
use livecast_core::{
    ChatSource, Config, CoreContext, CoreEvent, EventReceiver as CoreEventReceiver,
    PresenceSource, Telemetry, VideoBackend,
};

/// The open sessions, keyed by broadcaster.
pub type SessionStore = Arc<DashMap<String, Arc<LiveSession>>>;

/// The livecast client, facilitating live session management and the single
/// event stream the UI layer consumes.
pub struct Livecast {
    context: SessionContext,
    event_receiver: EventReceiver,

    pub sessions: SessionManager,
}

/// A type passed to the session components, to access the collaborators, the
/// session store, and the UI event stream.
#[derive(Clone)]
pub struct SessionContext {
    pub core: CoreContext,

    pub video: Arc<dyn VideoBackend>,
    pub chat: Arc<dyn ChatSource>,
    pub presence: Arc<dyn PresenceSource>,
    pub telemetry: Arc<dyn Telemetry>,

    pub sessions: SessionStore,

    event_sender: EventSender,
}

impl Livecast {
    /// Creates the client. Must be called within a tokio runtime.
    pub fn new(
        config: Config,
        video: Arc<dyn VideoBackend>,
        chat: Arc<dyn ChatSource>,
        presence: Arc<dyn PresenceSource>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let (core, core_receiver) = CoreContext::new(config);
        let (event_sender, event_receiver) = unbounded();

        let context = SessionContext {
            core,
            video,
            chat,
            presence,
            telemetry,
            sessions: Default::default(),
            event_sender,
        };

        spawn_event_pump(&context, core_receiver);

        Self {
            sessions: SessionManager::new(&context),
            context,
            event_receiver,
        }
    }

    /// The configuration the client was created with.
    pub fn config(&self) -> &Config {
        &self.context.core.config
    }

    /// Receive events from the client.
    pub fn wait_for_event(&self) -> SessionEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    /// Returns the next event, if one is already waiting.
    pub fn next_event(&self) -> Option<SessionEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl SessionContext {
    pub fn emit(&self, event: SessionEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}

/// Forwards core events to the UI stream, turning end-of-session detections
/// into session teardown along the way.
fn spawn_event_pump(context: &SessionContext, receiver: CoreEventReceiver) {
    let context = context.clone();

    let run = move || {
        while let Ok(event) = receiver.recv() {
            if let CoreEvent::SessionEnded { broadcaster_id } = &event {
                let session = context
                    .sessions
                    .get(broadcaster_id)
                    .map(|session| session.value().clone());

                if let Some(session) = session {
                    session.close(CloseReason::SessionEnded);
                }

                continue;
            }

            if let Some(event) = SessionEvent::from_core_event(event) {
                // The UI stream being gone just means the client shut down.
                if context.event_sender.send(event).is_err() {
                    break;
                }
            }
        }
    };

    thread::spawn(run);
}
