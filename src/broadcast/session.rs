//! Live subscriber sessions
//!
//! A session is transient: it exists only while the transport connection is
//! open and is never persisted. The hub keeps the sending half; the
//! subscriber drives the receiving half until disconnect.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{activity::ActivityEntry, identity::Actor};

/// Receiving half of a live feed subscription
///
/// Dropping the session (or the transport closing it) is enough to
/// disconnect; the hub evicts the sender side on the next delivery attempt.
pub struct SubscriberSession {
    /// Unique session identifier, used to unsubscribe explicitly
    pub session_id: String,
    /// The authenticated subscriber
    pub actor:      Actor,
    receiver:       mpsc::Receiver<ActivityEntry>,
    cancel:         CancellationToken
}

impl SubscriberSession {
    pub fn new(
        session_id: String,
        actor: Actor,
        receiver: mpsc::Receiver<ActivityEntry>,
        cancel: CancellationToken
    ) -> Self {
        Self { session_id, actor, receiver, cancel }
    }

    /// Next entry, or `None` once the session is closed
    pub async fn recv(&mut self) -> Option<ActivityEntry> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            entry = self.receiver.recv() => entry
        }
    }

    /// Next already-delivered entry without waiting
    pub fn try_recv(&mut self) -> Option<ActivityEntry> {
        self.receiver.try_recv().ok()
    }

    /// Whether the hub has closed this session
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
