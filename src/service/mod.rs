//! Workflow services - the only write paths to entity state
//!
//! Every operation follows the same discipline: validate input, acquire the
//! project lease, load and check state, apply one atomic batch, append the
//! ledger entries and enqueue the broadcast while the lease is still held,
//! then fire advisory side effects after commit.

pub mod activity;
pub mod lifecycle;
pub mod project;
pub mod request;
pub mod task;

pub use activity::*;
pub use lifecycle::*;
pub use project::*;
pub use request::*;
pub use task::*;

use std::{sync::Arc, time::Duration};

use tracing::{Level, event};

use crate::{
    broadcast::EventBroadcaster,
    domain::{activity::ActivityEntry, constant, policy::ProjectAccess},
    port::{ledger::Ledger, notifier::Notifier}
};

const LEDGER_RETRY_ATTEMPTS: u32 = 3;
const LEDGER_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Append a committed entry to the ledger and enqueue it for broadcast
///
/// Called while the originating operation still holds the project lease, so
/// entries for one project reach both the ledger and the hub in commit
/// order. The entity mutation is already durable at this point: an append
/// failure is logged and retried in the background, never rolled back.
pub(crate) async fn record_and_publish(
    ledger: &Arc<dyn Ledger>,
    broadcaster: &EventBroadcaster,
    entry: ActivityEntry,
    access: &ProjectAccess
) {
    if let Err(e) = ledger.append(&entry).await {
        event!(Level::ERROR, event = constant::ledger::APPEND_FAILED,
               project_id = %entry.project_id, action = %entry.action, error = %e);
        retry_append(ledger.clone(), entry.clone());
    }

    broadcaster.publish(entry, access.clone());
}

/// Background retry for a failed ledger append
fn retry_append(ledger: Arc<dyn Ledger>, entry: ActivityEntry) {
    tokio::spawn(async move {
        for attempt in 1..=LEDGER_RETRY_ATTEMPTS {
            tokio::time::sleep(LEDGER_RETRY_DELAY).await;

            match ledger.append(&entry).await {
                Ok(()) => {
                    event!(Level::INFO, event = constant::ledger::APPEND_RETRIED,
                           project_id = %entry.project_id, attempt = %attempt);
                    return;
                }
                Err(e) => {
                    event!(Level::WARN, event = constant::ledger::APPEND_FAILED,
                           project_id = %entry.project_id, attempt = %attempt, error = %e);
                }
            }
        }

        event!(Level::ERROR, event = constant::ledger::APPEND_ABANDONED,
               project_id = %entry.project_id, action = %entry.action);
    });
}

/// Fire-and-forget human notification, strictly after commit
///
/// A sink failure is logged and fully isolated from the workflow caller.
pub(crate) fn notify_after_commit(
    notifier: Arc<dyn Notifier>,
    recipient_id: String,
    subject: String,
    body: String
) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&recipient_id, &subject, &body).await {
            event!(Level::WARN, event = constant::notifier::NOTIFICATION_FAILED,
                   recipient = %recipient_id, subject = %subject, error = %e);
        }
    });
}
