use std::sync::{Arc, Weak};

use crossbeam::atomic::AtomicCell;
use log::{debug, warn};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::{CoreContext, CoreEvent};

use super::{PlaybackState, PlayerHandle, PlayerInit, RawPlayerEvent, VideoBackend};

/// The controller is responsible for one embedded player: it issues commands
/// to the backend and reports the state the backend pushes back.
///
/// The backend is authoritative. The controller never asserts a playback
/// state of its own, it only stores what [RawPlayerEvent]s tell it.
pub struct PlaybackController {
    context: CoreContext,
    broadcaster_id: String,
    backend: Arc<dyn VideoBackend>,
    /// Handed to backends and timers, so neither can keep a controller that
    /// has been dropped alive.
    weak_self: Weak<PlaybackController>,
    /// The live player instance, if the last load succeeded.
    handle: Mutex<Option<Arc<dyn PlayerHandle>>>,
    state: AtomicCell<PlaybackState>,
    /// Set on the first tap that plays or unmutes, never cleared while the
    /// controller is alive.
    user_has_interacted: AtomicCell<bool>,
    /// Incremented whenever the current player is replaced or destroyed, so
    /// callbacks from an old player instance are ignored.
    generation: AtomicCell<u64>,
    progress_task: Mutex<Option<JoinHandle<()>>>,
    unmute_task: Mutex<Option<JoinHandle<()>>>,
}

/// Handed to the backend on init. The backend pushes its callbacks through
/// this instead of holding the controller directly, so a player instance that
/// has been replaced can never update the controller again.
#[derive(Clone)]
pub struct PlayerEvents {
    controller: Weak<PlaybackController>,
    generation: u64,
}

impl PlayerEvents {
    pub fn push(&self, event: RawPlayerEvent) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_backend_event(self.generation, event);
        }
    }
}

impl PlaybackController {
    pub fn new(
        context: &CoreContext,
        broadcaster_id: &str,
        backend: Arc<dyn VideoBackend>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            context: context.clone(),
            broadcaster_id: broadcaster_id.to_string(),
            backend,
            weak_self: weak_self.clone(),
            handle: Default::default(),
            state: Default::default(),
            user_has_interacted: AtomicCell::new(false),
            generation: AtomicCell::new(0),
            progress_task: Default::default(),
            unmute_task: Default::default(),
        })
    }

    /// Initializes a muted, autoplaying player for the given video.
    ///
    /// Any previous player and its timers are released first, every time. A
    /// failed init is logged and leaves the controller in
    /// [PlaybackState::Unstarted] with all commands as no-ops, since a reload
    /// is the viewer's only recourse.
    pub async fn load(&self, video_ref: &str) {
        self.release_player();

        let generation = self.generation.load();
        let events = PlayerEvents {
            controller: self.weak_self.clone(),
            generation,
        };

        match self
            .backend
            .init_player(video_ref, PlayerInit::default(), events)
            .await
        {
            Ok(new_handle) => {
                // Destroyed while the backend was still initializing.
                if self.generation.load() != generation {
                    new_handle.destroy();
                    return;
                }

                *self.handle.lock() = Some(new_handle.into());
                self.spawn_progress_ticker();

                debug!("Loaded player for session {}", self.broadcaster_id);
            }
            Err(error) => {
                warn!(
                    "Player for session {} failed to load: {}",
                    self.broadcaster_id, error
                );
            }
        }
    }

    /// Returns the last state the backend pushed.
    pub fn reported_state(&self) -> PlaybackState {
        self.state.load()
    }

    /// Whether the current player is muted. A controller without a player
    /// counts as muted, since players always start that way.
    pub fn is_muted(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| handle.is_muted())
            .unwrap_or(true)
    }

    pub fn user_has_interacted(&self) -> bool {
        self.user_has_interacted.load()
    }

    /// The single "viewer tapped the video" command.
    ///
    /// A tap resumes a player that is not playing, and unmutes one that is.
    /// Both are folded into one gesture because a tap is the only reliable
    /// autoplay-unlock gesture on mobile browsers. The unmute after a resume
    /// is deferred slightly so the play command commits first.
    pub fn toggle_on_tap(&self) {
        let handle = match self.handle.lock().as_ref() {
            Some(handle) => handle.clone(),
            None => return,
        };

        let muted = handle.is_muted();

        match self.state.load() {
            PlaybackState::Unstarted | PlaybackState::Paused | PlaybackState::Cued => {
                handle.play();

                if muted {
                    self.schedule_unmute(handle);
                }

                self.user_has_interacted.store(true);
            }
            PlaybackState::Playing if muted => {
                handle.unmute();
                self.user_has_interacted.store(true);
            }
            // Already playing and audible, the tap has nothing left to unlock.
            _ => {}
        }
    }

    /// Issues a play command, if a player is loaded.
    pub fn play(&self) {
        self.with_handle(|handle| handle.play())
    }

    /// Issues a pause command, if a player is loaded.
    pub fn pause(&self) {
        self.with_handle(|handle| handle.pause())
    }

    /// Seeks to the given position in seconds, if a player is loaded.
    pub fn seek(&self, seconds: f32) {
        self.with_handle(|handle| handle.seek_to(seconds))
    }

    /// Mutes the player, if one is loaded.
    pub fn mute(&self) {
        self.with_handle(|handle| handle.mute())
    }

    /// Unmutes the player, if one is loaded.
    pub fn unmute(&self) {
        self.with_handle(|handle| handle.unmute())
    }

    /// Releases the player resource.
    ///
    /// Calling this when already destroyed is a no-op, since an explicit exit
    /// and a detected session end may race to call it.
    pub fn destroy(&self) {
        if self.release_player() {
            debug!("Player for session {} destroyed", self.broadcaster_id);
        }
    }

    /// Clears the timers, invalidates callbacks from the current player, and
    /// destroys it if it exists. Returns whether a player was destroyed.
    fn release_player(&self) -> bool {
        self.clear_tasks();
        self.generation.fetch_add(1);

        let handle = self.handle.lock().take();
        self.set_state_if_different(PlaybackState::Unstarted);

        match handle {
            Some(handle) => {
                handle.destroy();
                true
            }
            None => false,
        }
    }

    /// Runs a command against the current player, if there is one.
    fn with_handle(&self, command: impl FnOnce(&dyn PlayerHandle)) {
        if let Some(handle) = self.handle.lock().as_ref() {
            command(handle.as_ref())
        }
    }

    fn clear_tasks(&self) {
        let tasks = [
            self.progress_task.lock().take(),
            self.unmute_task.lock().take(),
        ];

        for task in tasks.into_iter().flatten() {
            task.abort();
        }
    }

    fn handle_backend_event(&self, generation: u64, event: RawPlayerEvent) {
        // The player this came from has since been replaced or destroyed.
        if generation != self.generation.load() {
            return;
        }

        match event {
            RawPlayerEvent::Ready => {
                debug!("Player for session {} is ready", self.broadcaster_id)
            }
            RawPlayerEvent::StateChange(new_state) => self.set_state_if_different(new_state),
            RawPlayerEvent::Error(error) => {
                // The session survives backend hiccups, the last reported state stands.
                warn!("Player for session {} errored: {}", self.broadcaster_id, error)
            }
        }
    }

    fn set_state_if_different(&self, state: PlaybackState) {
        if self.state.load() != state {
            self.state.store(state);

            self.context.emit(CoreEvent::PlaybackStateUpdate {
                broadcaster_id: self.broadcaster_id.clone(),
                new_state: state,
            });
        }
    }

    fn schedule_unmute(&self, handle: Arc<dyn PlayerHandle>) {
        let delay = self.context.config.unmute_delay();

        let task = self.context.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            handle.unmute();
        });

        // Never leave an older timer running next to a new one.
        if let Some(previous) = self.unmute_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn spawn_progress_ticker(&self) {
        let weak = self.weak_self.clone();
        let tick = self.context.config.progress_tick();

        let task = self.context.runtime.spawn(async move {
            let mut interval = tokio::time::interval(tick);

            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;

                match weak.upgrade() {
                    Some(controller) => controller.report_progress(),
                    None => break,
                }
            }
        });

        if let Some(previous) = self.progress_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn report_progress(&self) {
        if self.state.load() != PlaybackState::Playing {
            return;
        }

        let position = self
            .handle
            .lock()
            .as_ref()
            .map(|handle| handle.current_time());

        if let Some(position) = position {
            self.context.emit(CoreEvent::PlaybackTimeUpdate {
                broadcaster_id: self.broadcaster_id.clone(),
                position,
            });
        }
    }
}
