use chrono::Utc;
use crossbeam::atomic::AtomicCell;
use log::info;

use crate::{CoreContext, CoreEvent};

use super::PresenceSignal;

/// The monitor decides, from the noisy presence signal alone, when the
/// broadcast has actually ended.
///
/// There is no push "stream ended" event upstream, only a periodically
/// rewritten live flag with a heartbeat timestamp. A brief `is_live = false`
/// blip while the heartbeat is still fresh is therefore tolerated; only a
/// stale heartbeat, or a deleted record, is final.
pub struct PresenceMonitor {
    context: CoreContext,
    broadcaster_id: String,
    /// Latched on the first decision, so repeated stale updates can never
    /// trigger teardown twice.
    fired: AtomicCell<bool>,
}

impl PresenceMonitor {
    pub fn new(context: &CoreContext, broadcaster_id: &str) -> Self {
        Self {
            context: context.clone(),
            broadcaster_id: broadcaster_id.to_string(),
            fired: AtomicCell::new(false),
        }
    }

    /// Feeds one presence sample into the monitor. Called on every upstream
    /// update, including redundant repeats of the same value.
    pub fn on_update(&self, signal: PresenceSignal) {
        if self.fired.load() || signal.is_live {
            return;
        }

        match signal.last_heartbeat_at {
            // The record is gone entirely, which is a stronger signal than
            // staleness. No grace period.
            None => self.fire("presence record deleted"),
            Some(last_heartbeat) => {
                let lag = Utc::now() - last_heartbeat;

                if lag > self.context.config.stale_after() {
                    self.fire("heartbeat went stale");
                }

                // Otherwise the heartbeat writer may just be lagging, wait
                // for the next update.
            }
        }
    }

    /// Whether the monitor already decided the session is over.
    pub fn has_fired(&self) -> bool {
        self.fired.load()
    }

    /// Re-arms the monitor, for a viewer re-entering a session.
    pub fn reset(&self) {
        self.fired.store(false);
    }

    fn fire(&self, why: &str) {
        if self.fired.swap(true) {
            return;
        }

        info!("Session {} ended: {}", self.broadcaster_id, why);

        self.context.emit(CoreEvent::SessionEnded {
            broadcaster_id: self.broadcaster_id.clone(),
        });
    }
}
