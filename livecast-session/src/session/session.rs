use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use log::{info, warn};
use parking_lot::Mutex;

use livecast_core::{
    ChatMessage, ChatReconciler, PlaybackController, PlaybackState, PresenceMonitor, Subscription,
};

use crate::{CloseReason, SessionContext, SessionError, SessionEvent};

use super::SessionData;

/// One live session as seen by a viewer, composing playback, chat, and
/// presence monitoring.
///
/// The session never reaches into its subsystems' state. It only invokes
/// their commands, since each has its own idempotency and failure rules.
pub struct LiveSession {
    context: SessionContext,
    data: SessionData,

    playback: Arc<PlaybackController>,
    chat: Arc<ChatReconciler>,
    presence: Arc<PresenceMonitor>,

    /// Upstream subscriptions, cancelled on close.
    subscriptions: Mutex<Vec<Subscription>>,
    /// The single teardown guard. Checked and set in one step, since a user
    /// exit and a detected session end may race to tear down.
    closed: AtomicCell<bool>,
}

impl LiveSession {
    pub(crate) fn new(context: &SessionContext, data: SessionData) -> Self {
        let playback = PlaybackController::new(
            &context.core,
            &data.broadcaster_id,
            context.video.clone(),
        );

        let chat = ChatReconciler::new(
            &context.core,
            &data.broadcaster_id,
            &data.viewer_id,
            &data.viewer_name,
            context.chat.clone(),
        );

        let presence = Arc::new(PresenceMonitor::new(&context.core, &data.broadcaster_id));

        Self {
            context: context.clone(),
            data,
            playback,
            chat,
            presence,
            subscriptions: Default::default(),
            closed: AtomicCell::new(false),
        }
    }

    /// Wires the subsystems to their upstreams and starts playback.
    pub(crate) async fn start(&self) {
        let chat_subscription = {
            let reconciler = self.chat.clone();

            self.context.chat.subscribe(
                &self.data.broadcaster_id,
                Arc::new(move |messages| reconciler.on_snapshot(messages)),
            )
        };

        let presence_subscription = {
            let monitor = self.presence.clone();

            self.context.presence.subscribe(
                &self.data.broadcaster_id,
                Arc::new(move |signal| monitor.on_update(signal)),
            )
        };

        {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.push(chat_subscription);
            subscriptions.push(presence_subscription);
        }

        self.playback.load(&self.data.video_ref).await;
        self.track_joined();

        info!(
            "Viewer {} joined session {}",
            self.data.viewer_name, self.data.title
        );
    }

    /// The viewer tapped the video.
    pub fn tap_video(&self) {
        if self.closed.load() {
            return;
        }

        self.playback.toggle_on_tap();
    }

    /// Sends a chat message, echoing it optimistically. Returns the id of
    /// the optimistic entry.
    pub fn send_chat(&self, text: &str) -> Result<String, SessionError> {
        if self.closed.load() {
            return Err(SessionError::Closed);
        }

        Ok(self.chat.send(text))
    }

    /// The viewer left on their own.
    pub fn exit(&self) {
        self.close(CloseReason::UserExit);
    }

    /// Tears the session down: destroys playback, cancels the upstream
    /// subscriptions, and emits a single closed event.
    ///
    /// Only the first call does anything, no matter who wins the race.
    pub fn close(&self, reason: CloseReason) {
        if self.closed.swap(true) {
            return;
        }

        self.playback.destroy();

        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }

        self.context.sessions.remove(&self.data.broadcaster_id);
        self.track_left();

        info!("Session {} closed ({:?})", self.data.title, reason);

        self.context.emit(SessionEvent::SessionClosed {
            broadcaster_id: self.data.broadcaster_id.clone(),
            reason,
        });
    }

    pub fn data(&self) -> SessionData {
        self.data.clone()
    }

    pub fn broadcaster_id(&self) -> &str {
        &self.data.broadcaster_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load()
    }

    /// The last playback state the video backend reported.
    pub fn playback_state(&self) -> PlaybackState {
        self.playback.reported_state()
    }

    /// The reconciled chat list.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.chat.messages()
    }

    fn track_joined(&self) {
        let telemetry = self.context.telemetry.clone();
        let broadcaster_id = self.data.broadcaster_id.clone();
        let viewer_id = self.data.viewer_id.clone();

        self.context.core.runtime.spawn(async move {
            if let Err(error) = telemetry.track_joined(&broadcaster_id, &viewer_id).await {
                warn!("Join tracking failed: {}", error);
            }
        });
    }

    fn track_left(&self) {
        let telemetry = self.context.telemetry.clone();
        let broadcaster_id = self.data.broadcaster_id.clone();
        let viewer_id = self.data.viewer_id.clone();

        self.context.core.runtime.spawn(async move {
            if let Err(error) = telemetry.track_left(&broadcaster_id, &viewer_id).await {
                warn!("Leave tracking failed: {}", error);
            }
        });
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::Utc;
    use livecast_core::{Config, PresenceSignal, Telemetry};
    use livecast_impls::{
        FailingTelemetry, MemoryChatSource, MemoryPresenceSource, NullTelemetry,
        ScriptedVideoBackend,
    };

    use super::*;
    use crate::Livecast;

    struct TestClient {
        livecast: Livecast,
        video: Arc<ScriptedVideoBackend>,
        chat: Arc<MemoryChatSource>,
        presence: Arc<MemoryPresenceSource>,
        telemetry: Arc<NullTelemetry>,
    }

    fn client() -> TestClient {
        client_with_telemetry(Arc::new(NullTelemetry::new()))
    }

    fn client_with_telemetry(telemetry: Arc<NullTelemetry>) -> TestClient {
        let video = Arc::new(ScriptedVideoBackend::new());
        let chat = Arc::new(MemoryChatSource::new());
        let presence = Arc::new(MemoryPresenceSource::new());

        let livecast = Livecast::new(
            Config::default(),
            video.clone(),
            chat.clone(),
            presence.clone(),
            telemetry.clone(),
        );

        TestClient {
            livecast,
            video,
            chat,
            presence,
            telemetry,
        }
    }

    fn data(broadcaster_id: &str) -> SessionData {
        SessionData {
            broadcaster_id: broadcaster_id.to_string(),
            video_ref: "video-1".to_string(),
            title: "Morning show".to_string(),
            description: "A test broadcast".to_string(),
            viewer_id: "viewer".to_string(),
            viewer_name: "Viewer".to_string(),
        }
    }

    /// Waits for the next closed event, skipping everything else.
    fn wait_for_closed(livecast: &Livecast) -> CloseReason {
        loop {
            if let SessionEvent::SessionClosed { reason, .. } = livecast.wait_for_event() {
                return reason;
            }
        }
    }

    #[tokio::test]
    async fn test_open_wires_playback_and_chat() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        assert_eq!(client.video.player_count(), 1);
        assert_eq!(session.playback_state(), PlaybackState::Cued);

        client.chat.push("b1", "other", "Other", "welcome!");

        assert_eq!(session.chat_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let client = client();

        client.livecast.sessions.open(data("b1")).await.unwrap();
        let result = client.livecast.sessions.open(data("b1")).await;

        assert!(matches!(result, Err(SessionError::AlreadyOpen)));
    }

    #[tokio::test]
    async fn test_close_tears_down_exactly_once() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        // A user exit and a detected end racing to tear down.
        session.close(CloseReason::UserExit);
        session.close(CloseReason::SessionEnded);

        assert_eq!(
            client.video.player(0).destroy_count(),
            1,
            "the player should be destroyed exactly once"
        );

        let closed_events = std::iter::from_fn(|| client.livecast.next_event())
            .filter(|event| matches!(event, SessionEvent::SessionClosed { .. }))
            .count();

        assert_eq!(closed_events, 1, "only one closed event should be emitted");
        assert!(client.livecast.sessions.get("b1").is_none());
    }

    #[tokio::test]
    async fn test_exit_cancels_the_upstream_subscriptions() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        session.exit();
        client.chat.push("b1", "other", "Other", "too late");

        assert!(session.chat_messages().is_empty());
        assert!(matches!(
            session.send_chat("hello?"),
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_stale_presence_closes_the_session() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        client.presence.set(
            "b1",
            PresenceSignal {
                is_live: false,
                last_heartbeat_at: Some(Utc::now() - chrono::Duration::seconds(20)),
            },
        );

        let reason = wait_for_closed(&client.livecast);

        assert_eq!(reason, CloseReason::SessionEnded);
        assert!(session.is_closed());
        assert_eq!(client.video.player(0).destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_deleted_presence_record_closes_immediately() {
        let client = client();

        client.livecast.sessions.open(data("b1")).await.unwrap();
        client.presence.delete("b1");

        let reason = wait_for_closed(&client.livecast);

        assert_eq!(reason, CloseReason::SessionEnded);
    }

    #[tokio::test]
    async fn test_fresh_heartbeat_blip_keeps_the_session_alive() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        client.presence.set(
            "b1",
            PresenceSignal {
                is_live: false,
                last_heartbeat_at: Some(Utc::now() - chrono::Duration::seconds(5)),
            },
        );

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.is_closed(), "a blip should not end the session");
    }

    #[tokio::test]
    async fn test_send_chat_confirms_through_the_stream() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        session.send_chat("hi everyone").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let messages = session.chat_messages();

        assert_eq!(messages.len(), 1, "echo and confirmation should merge");
        assert!(!messages[0].is_pending());
        assert_eq!(messages[0].text, "hi everyone");
    }

    #[tokio::test]
    async fn test_failed_send_surfaces_and_rolls_back() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        client.chat.fail_next_send();
        session.send_chat("lost").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(
            session.chat_messages().is_empty(),
            "the echo should be rolled back"
        );

        let failed = std::iter::from_fn(|| client.livecast.next_event())
            .any(|event| matches!(event, SessionEvent::ChatSendFailed { .. }));

        assert!(failed, "the failure should reach the UI stream");
    }

    #[tokio::test]
    async fn test_progress_is_reported_while_playing() {
        let client = client();

        let _session = client.livecast.sessions.open(data("b1")).await.unwrap();

        client.video.player(0).report(PlaybackState::Playing);
        client.video.player(0).set_position(7.5);

        // The ticker fires about once a second.
        let mut position = None;

        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(100)).await;

            while let Some(event) = client.livecast.next_event() {
                if let SessionEvent::PlaybackTimeChanged { position: p, .. } = event {
                    position = Some(p);
                }
            }

            if position.is_some() {
                break;
            }
        }

        assert_eq!(position, Some(7.5));
    }

    #[tokio::test]
    async fn test_backend_errors_do_not_disturb_the_state() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        client.video.player(0).report(PlaybackState::Playing);
        client.video.player(0).error("decoder hiccup");

        assert_eq!(session.playback_state(), PlaybackState::Playing);
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_tap_reaches_the_player() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();

        session.tap_video();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let commands = client.video.player(0).commands();

        assert_eq!(commands, vec!["play", "unmute"]);
    }

    #[tokio::test]
    async fn test_telemetry_tracks_join_and_leave() {
        let client = client();

        let session = client.livecast.sessions.open(data("b1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.telemetry.joins(), 1);

        session.exit();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.telemetry.leaves(), 1);
    }

    #[tokio::test]
    async fn test_telemetry_failures_are_swallowed() {
        let telemetry = Arc::new(FailingTelemetry::new());
        let video = Arc::new(ScriptedVideoBackend::new());
        let chat = Arc::new(MemoryChatSource::new());
        let presence = Arc::new(MemoryPresenceSource::new());

        let livecast = Livecast::new(
            Config::default(),
            video,
            chat,
            presence,
            telemetry.clone() as Arc<dyn Telemetry>,
        );

        let session = livecast.sessions.open(data("b1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.is_closed(), "telemetry must never affect a session");

        session.exit();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(telemetry.attempts(), 2);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_close_all_closes_every_session() {
        let client = client();

        client.livecast.sessions.open(data("b1")).await.unwrap();
        client.livecast.sessions.open(data("b2")).await.unwrap();

        client.livecast.sessions.close_all();

        assert!(client.livecast.sessions.list_all().is_empty());
        assert_eq!(client.video.player(0).destroy_count(), 1);
        assert_eq!(client.video.player(1).destroy_count(), 1);
    }
}
