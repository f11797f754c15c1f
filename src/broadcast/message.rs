//! Typed messages for the broadcast hub actor

use ractor::{Message, RpcReplyPort};

use crate::{
    broadcast::session::SubscriberSession,
    domain::{activity::ActivityEntry, identity::Actor, policy::ProjectAccess}
};

/// Messages for the BroadcastHub actor
pub enum HubMessage {
    /// Open a live feed session for an authenticated actor
    Subscribe { actor: Actor, reply: RpcReplyPort<SubscriberSession> },
    /// Close a session explicitly
    Unsubscribe { session_id: String },
    /// Fan a committed ledger entry out to authorized sessions
    Publish { entry: ActivityEntry, access: ProjectAccess },
    /// Get the number of currently open sessions
    SessionCount { reply: RpcReplyPort<usize> }
}

// Implement Message trait for Ractor
impl Message for HubMessage {}
