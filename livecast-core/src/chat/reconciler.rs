use std::sync::{Arc, Weak};

use chrono::Utc;
use log::warn;
use parking_lot::Mutex;

use crate::{random_token, Config, CoreContext, CoreEvent};

use super::{ChatError, ChatMessage, ChatSource};

/// The reconciler merges the upstream snapshot log with locally-sent
/// optimistic messages into one deduplicated display list.
///
/// The upstream never sends deltas, only the whole log. Growth, shrinkage,
/// and the first load therefore have to be told apart here, and each is
/// handled differently.
pub struct ChatReconciler {
    context: CoreContext,
    broadcaster_id: String,
    viewer_id: String,
    viewer_name: String,
    source: Arc<dyn ChatSource>,
    /// Handed to the in-flight send task, so a finished send can still roll
    /// its echo back without keeping a dropped reconciler alive.
    weak_self: Weak<ChatReconciler>,
    state: Mutex<ChatState>,
}

#[derive(Default)]
struct ChatState {
    /// How many upstream messages have been consumed from the snapshot log.
    seen_count: usize,
    /// Optimistic entries awaiting confirmation.
    pending: Vec<ChatMessage>,
    /// The reconciled list, in display order.
    displayed: Vec<ChatMessage>,
}

impl ChatReconciler {
    pub fn new(
        context: &CoreContext,
        broadcaster_id: &str,
        viewer_id: &str,
        viewer_name: &str,
        source: Arc<dyn ChatSource>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            context: context.clone(),
            broadcaster_id: broadcaster_id.to_string(),
            viewer_id: viewer_id.to_string(),
            viewer_name: viewer_name.to_string(),
            source,
            weak_self: weak_self.clone(),
            state: Default::default(),
        })
    }

    /// The current display list.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().displayed.clone()
    }

    /// Consumes one full snapshot of the upstream log.
    pub fn on_snapshot(&self, messages: Vec<ChatMessage>) {
        let mut state = self.state.lock();

        if state.seen_count == 0 || messages.len() < state.seen_count {
            // The first real snapshot and an upstream reset both replace the
            // list wholesale, absorbing any optimistic entries with it.
            state.seen_count = messages.len();
            state.pending.clear();
            state.displayed = messages;
        } else if messages.len() > state.seen_count {
            let delta = messages[state.seen_count..].to_vec();
            state.seen_count = messages.len();

            for confirmed in &delta {
                self.absorb_pending(&mut state, confirmed);
            }

            state.displayed.extend(delta);
            self.drop_expired(&mut state);
        } else {
            // Nothing new.
            return;
        }

        self.emit_list(&state);
    }

    /// Appends an optimistic echo of the message and hands it to the
    /// upstream, returning the optimistic entry's id.
    ///
    /// The echo is removed again when the send fails, or replaced by the
    /// confirmed message when a later snapshot absorbs it. A failed send is
    /// never retried here.
    pub fn send(&self, text: &str) -> String {
        let pending = ChatMessage {
            message_id: format!(
                "{}{}",
                Config::PENDING_ID_PREFIX,
                random_token(self.context.config.pending_id_length)
            ),
            user_id: self.viewer_id.clone(),
            display_name: self.viewer_name.clone(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };

        {
            let mut state = self.state.lock();

            self.drop_expired(&mut state);
            state.pending.push(pending.clone());
            state.displayed.push(pending.clone());

            self.emit_list(&state);
        }

        let weak = self.weak_self.clone();
        let source = self.source.clone();
        let broadcaster_id = self.broadcaster_id.clone();
        let viewer_id = self.viewer_id.clone();
        let viewer_name = self.viewer_name.clone();
        let pending_id = pending.message_id.clone();
        let text = text.to_string();

        self.context.runtime.spawn(async move {
            let result = source
                .send(&broadcaster_id, &viewer_id, &viewer_name, &text)
                .await;

            if let Err(error) = result {
                if let Some(reconciler) = weak.upgrade() {
                    reconciler.roll_back(&pending_id, error);
                }
            }
        });

        pending.message_id
    }

    /// Removes the optimistic entry a confirmed message corresponds to, if
    /// there is one.
    fn absorb_pending(&self, state: &mut ChatState, confirmed: &ChatMessage) {
        let window = self.context.config.reconcile_window();

        let matched = state.pending.iter().position(|pending| {
            pending.user_id == confirmed.user_id
                && pending.text == confirmed.text
                && (pending.sent_at - confirmed.sent_at).abs() <= window
        });

        if let Some(index) = matched {
            let pending_id = state.pending.remove(index).message_id;
            state
                .displayed
                .retain(|message| message.message_id != pending_id);
        }
    }

    /// Drops optimistic entries that outlived the reconciliation window
    /// without being confirmed.
    fn drop_expired(&self, state: &mut ChatState) {
        let cutoff = Utc::now() - self.context.config.reconcile_window();

        let expired: Vec<_> = state
            .pending
            .iter()
            .filter(|message| message.sent_at < cutoff)
            .map(|message| message.message_id.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        state
            .pending
            .retain(|message| !expired.contains(&message.message_id));
        state
            .displayed
            .retain(|message| !expired.contains(&message.message_id));
    }

    fn roll_back(&self, pending_id: &str, error: ChatError) {
        warn!(
            "Message {} to session {} failed: {}",
            pending_id, self.broadcaster_id, error
        );

        {
            let mut state = self.state.lock();

            state
                .pending
                .retain(|message| message.message_id != pending_id);
            state
                .displayed
                .retain(|message| message.message_id != pending_id);

            self.emit_list(&state);
        }

        self.context.emit(CoreEvent::ChatSendFailed {
            broadcaster_id: self.broadcaster_id.clone(),
            pending_id: pending_id.to_string(),
            error: error.to_string(),
        });
    }

    fn emit_list(&self, state: &ChatState) {
        self.context.emit(CoreEvent::ChatListUpdate {
            broadcaster_id: self.broadcaster_id.clone(),
            messages: state.displayed.clone(),
        });
    }
}
