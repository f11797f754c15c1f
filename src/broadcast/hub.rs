//! Broadcast hub actor - live fan-out of ledger entries
//!
//! The hub is an explicit process-wide component, not ambient global state:
//! constructed once at startup, it holds the registry of open subscriber
//! sessions and is torn down by stopping the actor, which closes every
//! session. Workflow services publish with a cast while still holding the
//! project lease, so entries for one project reach the mailbox - and every
//! session - in commit order.
//!
//! Delivery is best-effort. Each session has a bounded channel; a full or
//! disconnected session never blocks the publish path or the originating
//! request. Filtering applies the VIEW_ACTIVITY rule against the
//! `ProjectAccess` snapshot captured in the originating transaction, so
//! unauthorized sessions silently do not receive the entry.

use std::collections::HashMap;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, rpc::CallResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    broadcast::{message::HubMessage, session::SubscriberSession},
    domain::{activity::ActivityEntry, constant::hub, error::MarketError, identity::Actor as MarketActor,
             policy::ProjectAccess}
};

/// Sending half of one subscriber session
struct SessionHandle {
    actor:  MarketActor,
    sender: mpsc::Sender<ActivityEntry>,
    cancel: CancellationToken
}

/// Hub actor state - session registry and delivery statistics
pub struct BroadcastHubState {
    sessions:        HashMap<String, SessionHandle>,
    feed_buffer:     usize,
    total_published: u64,
    total_delivered: u64,
    total_dropped:   u64
}

/// Broadcast hub actor
pub struct BroadcastHub;

#[async_trait::async_trait]
impl Actor for BroadcastHub {
    type Arguments = usize;
    type Msg = HubMessage;
    type State = BroadcastHubState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        feed_buffer: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = hub::HUB_STARTED, feed_buffer = %feed_buffer);

        Ok(BroadcastHubState {
            sessions: HashMap::new(),
            feed_buffer,
            total_published: 0,
            total_delivered: 0,
            total_dropped: 0
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            HubMessage::Subscribe { actor, reply } => self.handle_subscribe(actor, reply, state),
            HubMessage::Unsubscribe { session_id } => self.handle_unsubscribe(&session_id, state),
            HubMessage::Publish { entry, access } => self.handle_publish(entry, access, state),
            HubMessage::SessionCount { reply } => {
                if let Err(e) = reply.send(state.sessions.len()) {
                    event!(Level::ERROR, event = hub::SESSION_OPENED, error = %e);
                }
                Ok(())
            }
        }
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        for (session_id, handle) in state.sessions.drain() {
            handle.cancel.cancel();
            event!(Level::DEBUG, event = hub::SESSION_CLOSED, session_id = %session_id);
        }

        event!(Level::INFO, event = hub::HUB_STOPPED,
               total_published = %state.total_published,
               total_delivered = %state.total_delivered,
               total_dropped = %state.total_dropped);
        Ok(())
    }
}

impl BroadcastHub {
    fn handle_subscribe(
        &self,
        actor: MarketActor,
        reply: RpcReplyPort<SubscriberSession>,
        state: &mut BroadcastHubState
    ) -> Result<(), ActorProcessingErr> {
        let session_id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::channel(state.feed_buffer);
        let cancel = CancellationToken::new();

        let session = SubscriberSession::new(session_id.clone(), actor.clone(), receiver, cancel.clone());
        state.sessions.insert(session_id.clone(), SessionHandle { actor, sender, cancel });

        event!(Level::DEBUG, event = hub::SESSION_OPENED,
               session_id = %session_id, open_sessions = %state.sessions.len());

        if let Err(e) = reply.send(session) {
            // Subscriber vanished before the reply arrived
            if let Some(handle) = state.sessions.remove(&session_id) {
                handle.cancel.cancel();
            }
            event!(Level::ERROR, event = hub::SESSION_CLOSED, session_id = %session_id, error = %e);
        }

        Ok(())
    }

    fn handle_unsubscribe(&self, session_id: &str, state: &mut BroadcastHubState) -> Result<(), ActorProcessingErr> {
        if let Some(handle) = state.sessions.remove(session_id) {
            handle.cancel.cancel();
            event!(Level::DEBUG, event = hub::SESSION_CLOSED,
                   session_id = %session_id, open_sessions = %state.sessions.len());
        }

        Ok(())
    }

    fn handle_publish(
        &self,
        entry: ActivityEntry,
        access: ProjectAccess,
        state: &mut BroadcastHubState
    ) -> Result<(), ActorProcessingErr> {
        state.total_published += 1;
        let mut disconnected = Vec::new();

        for (session_id, handle) in &state.sessions {
            if !access.grants_view(&handle.actor) {
                continue;
            }

            match handle.sender.try_send(entry.clone()) {
                Ok(()) => {
                    state.total_delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow subscriber: drop this entry for them, keep going
                    state.total_dropped += 1;
                    event!(Level::WARN, event = hub::ENTRY_DROPPED,
                           session_id = %session_id, project_id = %entry.project_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    disconnected.push(session_id.clone());
                }
            }
        }

        for session_id in disconnected {
            if let Some(handle) = state.sessions.remove(&session_id) {
                handle.cancel.cancel();
                event!(Level::DEBUG, event = hub::SESSION_EVICTED, session_id = %session_id);
            }
        }

        event!(Level::DEBUG, event = hub::ENTRY_PUBLISHED,
               project_id = %entry.project_id, action = %entry.action,
               total_published = %state.total_published);

        Ok(())
    }
}

/// Handle to the spawned hub used by services and subscribers
///
/// Publishing is fire-and-forget; a dead hub is logged, never surfaced to
/// the workflow caller.
#[derive(Clone)]
pub struct EventBroadcaster {
    hub: ActorRef<HubMessage>
}

impl EventBroadcaster {
    /// Spawn the hub actor; called once at startup
    pub async fn spawn(feed_buffer: usize) -> Result<Self, MarketError> {
        let (hub, _handle) = Actor::spawn(None, BroadcastHub, feed_buffer).await?;
        Ok(Self { hub })
    }

    /// Open a live feed session for an actor
    pub async fn subscribe(&self, actor: MarketActor) -> Result<SubscriberSession, MarketError> {
        match ractor::rpc::call(
            &self.hub,
            |reply| HubMessage::Subscribe { actor, reply },
            Some(std::time::Duration::from_secs(5))
        )
        .await
        {
            Ok(CallResult::Success(session)) => Ok(session),
            Ok(_) => Err(MarketError::Generic("Broadcast hub did not answer the subscribe call".to_string())),
            Err(e) => Err(MarketError::Generic(format!("Failed to subscribe: {}", e)))
        }
    }

    /// Close a session explicitly
    pub fn unsubscribe(&self, session_id: &str) {
        if let Err(e) = self.hub.cast(HubMessage::Unsubscribe { session_id: session_id.to_string() }) {
            event!(Level::WARN, event = hub::SESSION_CLOSED, session_id = %session_id, error = %e);
        }
    }

    /// Enqueue a committed ledger entry for fan-out
    pub fn publish(&self, entry: ActivityEntry, access: ProjectAccess) {
        if let Err(e) = self.hub.cast(HubMessage::Publish { entry, access }) {
            event!(Level::WARN, event = hub::ENTRY_DROPPED, error = %e);
        }
    }

    /// Number of currently open sessions
    pub async fn session_count(&self) -> usize {
        match ractor::rpc::call(&self.hub, |reply| HubMessage::SessionCount { reply }, None).await {
            Ok(CallResult::Success(count)) => count,
            _ => 0
        }
    }

    /// Stop the hub, closing every open session
    pub fn stop(&self) {
        self.hub.stop(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityAction;

    fn entry(project_id: &str, message: &str) -> ActivityEntry {
        ActivityEntry::new(ActivityAction::TaskCreated, "solver-1", project_id, message)
    }

    fn access(buyer: &str, solver: Option<&str>) -> ProjectAccess {
        ProjectAccess { buyer_id: buyer.to_string(), assigned_solver_id: solver.map(|s| s.to_string()) }
    }

    #[tokio::test]
    async fn delivery_is_filtered_by_project_access() {
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();

        let mut buyer = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();
        let mut solver = broadcaster.subscribe(MarketActor::solver("solver-1")).await.unwrap();
        let mut admin = broadcaster.subscribe(MarketActor::admin("admin-1")).await.unwrap();
        let mut outsider = broadcaster.subscribe(MarketActor::solver("solver-2")).await.unwrap();

        broadcaster.publish(entry("p-1", "Task created"), access("buyer-1", Some("solver-1")));

        assert_eq!(buyer.recv().await.unwrap().message, "Task created");
        assert_eq!(solver.recv().await.unwrap().message, "Task created");
        assert_eq!(admin.recv().await.unwrap().message, "Task created");

        // The unrelated solver never sees the entry; a later visible entry
        // arriving first proves the p-1 entry was filtered, not delayed
        broadcaster.publish(entry("p-2", "Visible"), access("buyer-9", Some("solver-2")));
        assert_eq!(outsider.recv().await.unwrap().message, "Visible");
        assert!(outsider.try_recv().is_none());

        broadcaster.stop();
    }

    #[tokio::test]
    async fn delivery_preserves_per_project_order() {
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();
        let mut session = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();

        for i in 0..5 {
            broadcaster.publish(entry("p-1", &format!("entry-{}", i)), access("buyer-1", None));
        }

        for i in 0..5 {
            assert_eq!(session.recv().await.unwrap().message, format!("entry-{}", i));
        }

        broadcaster.stop();
    }

    #[tokio::test]
    async fn slow_subscriber_drops_instead_of_blocking() {
        let broadcaster = EventBroadcaster::spawn(1).await.unwrap();

        let mut slow = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();

        // Buffer of one: the second and third publishes overflow the slow
        // session but the publish path itself never stalls
        for i in 0..3 {
            broadcaster.publish(entry("p-1", &format!("entry-{}", i)), access("buyer-1", None));
        }
        // Synchronize on the mailbox so all publishes are processed
        let _ = broadcaster.session_count().await;

        assert_eq!(slow.recv().await.unwrap().message, "entry-0");
        assert!(slow.try_recv().is_none());

        broadcaster.stop();
    }

    #[tokio::test]
    async fn disconnected_sessions_are_evicted() {
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();

        let session = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();
        assert_eq!(broadcaster.session_count().await, 1);

        drop(session);
        broadcaster.publish(entry("p-1", "after disconnect"), access("buyer-1", None));

        assert_eq!(broadcaster.session_count().await, 0);

        broadcaster.stop();
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_session() {
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();

        let mut session = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();
        broadcaster.unsubscribe(&session.session_id);

        assert!(session.recv().await.is_none());
        assert_eq!(broadcaster.session_count().await, 0);

        broadcaster.stop();
    }

    #[tokio::test]
    async fn stopping_the_hub_closes_all_sessions() {
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();

        let mut first = broadcaster.subscribe(MarketActor::buyer("buyer-1")).await.unwrap();
        let mut second = broadcaster.subscribe(MarketActor::solver("solver-1")).await.unwrap();

        broadcaster.stop();

        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_none());
    }
}
