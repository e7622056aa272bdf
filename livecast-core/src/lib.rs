use crossbeam::channel::unbounded;
use tokio::runtime::Handle;

mod chat;
mod config;
mod events;
mod playback;
mod presence;
mod telemetry;
mod util;

pub use chat::*;
pub use config::*;
pub use events::*;
pub use playback::*;
pub use presence::*;
pub use telemetry::*;
pub use util::*;

/// A type passed to the client subsystems, to access config, emit events, and
/// spawn fire-and-forget work.
///
/// Must be created within a tokio runtime, since it captures a handle to it.
#[derive(Clone)]
pub struct CoreContext {
    pub config: Config,
    pub runtime: Handle,

    event_sender: EventSender,
}

impl CoreContext {
    /// Creates a context and the receiving end of its event channel.
    pub fn new(config: Config) -> (Self, EventReceiver) {
        let (event_sender, event_receiver) = unbounded();

        let context = Self {
            config,
            runtime: Handle::current(),
            event_sender,
        };

        (context, event_receiver)
    }

    pub fn emit(&self, event: CoreEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}
