use std::sync::Arc;

use async_trait::async_trait;
use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;

use livecast_core::{
    PlaybackError, PlaybackState, PlayerEvents, PlayerHandle, PlayerInit, RawPlayerEvent,
    VideoBackend,
};

/// A video backend whose players do nothing but record the commands they are
/// given, while tests script the states they report back.
#[derive(Default)]
pub struct ScriptedVideoBackend {
    fail_next_init: AtomicCell<bool>,
    players: Mutex<Vec<Arc<ScriptedPlayer>>>,
}

/// One scripted player instance.
pub struct ScriptedPlayer {
    pub video_ref: String,
    events: PlayerEvents,
    state: AtomicCell<PlaybackState>,
    muted: AtomicCell<bool>,
    position: AtomicCell<f32>,
    commands: Mutex<Vec<&'static str>>,
    destroys: AtomicCell<u32>,
}

impl ScriptedVideoBackend {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes the next `init_player` call fail.
    pub fn fail_next_init(&self) {
        self.fail_next_init.store(true);
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().len()
    }

    pub fn player(&self, index: usize) -> Arc<ScriptedPlayer> {
        self.players.lock()[index].clone()
    }

    pub fn last_player(&self) -> Option<Arc<ScriptedPlayer>> {
        self.players.lock().last().cloned()
    }
}

impl ScriptedPlayer {
    /// Reports a state change the way a real backend callback would.
    pub fn report(&self, state: PlaybackState) {
        self.state.store(state);
        self.events.push(RawPlayerEvent::StateChange(state));
    }

    /// Reports a backend error.
    pub fn error(&self, message: &str) {
        self.events.push(RawPlayerEvent::Error(message.to_string()));
    }

    /// Moves the scripted playhead.
    pub fn set_position(&self, seconds: f32) {
        self.position.store(seconds);
    }

    /// The commands issued to this player so far, in order.
    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().clone()
    }

    pub fn destroy_count(&self) -> u32 {
        self.destroys.load()
    }

    fn record(&self, command: &'static str) {
        self.commands.lock().push(command)
    }
}

struct ScriptedHandle(Arc<ScriptedPlayer>);

impl PlayerHandle for ScriptedHandle {
    fn play(&self) {
        self.0.record("play")
    }

    fn pause(&self) {
        self.0.record("pause")
    }

    fn seek_to(&self, _seconds: f32) {
        self.0.record("seek")
    }

    fn mute(&self) {
        self.0.record("mute");
        self.0.muted.store(true)
    }

    fn unmute(&self) {
        self.0.record("unmute");
        self.0.muted.store(false)
    }

    fn is_muted(&self) -> bool {
        self.0.muted.load()
    }

    fn current_state(&self) -> PlaybackState {
        self.0.state.load()
    }

    fn current_time(&self) -> f32 {
        self.0.position.load()
    }

    fn destroy(&self) {
        self.0.destroys.fetch_add(1);
    }
}

#[async_trait]
impl VideoBackend for ScriptedVideoBackend {
    async fn init_player(
        &self,
        video_ref: &str,
        init: PlayerInit,
        events: PlayerEvents,
    ) -> Result<Box<dyn PlayerHandle>, PlaybackError> {
        if self.fail_next_init.swap(false) {
            return Err(PlaybackError::InitFailed(
                "scripted init failure".to_string(),
            ));
        }

        let player = Arc::new(ScriptedPlayer {
            video_ref: video_ref.to_string(),
            events: events.clone(),
            state: AtomicCell::new(PlaybackState::Unstarted),
            muted: AtomicCell::new(init.muted),
            position: AtomicCell::new(0.),
            commands: Default::default(),
            destroys: AtomicCell::new(0),
        });

        self.players.lock().push(player.clone());

        // A real backend announces itself, then cues the media up.
        events.push(RawPlayerEvent::Ready);
        player.report(PlaybackState::Cued);

        Ok(Box::new(ScriptedHandle(player)))
    }
}
