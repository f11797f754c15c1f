//! Structured event names for internal monitoring and debugging

/// Workflow service events
pub mod workflow {
    pub const PROJECT_CREATED: &str = "project.created";
    pub const PROJECT_UPDATED: &str = "project.updated";
    pub const PROJECT_CANCELLED: &str = "project.cancelled";
    pub const PROJECT_COMPLETED: &str = "project.completed";
    pub const REQUEST_CREATED: &str = "request.created";
    pub const REQUEST_ACCEPTED: &str = "request.accepted";
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_SUBMITTED: &str = "task.submitted";
    pub const TASK_REVIEWED: &str = "task.reviewed";
}

/// Entity store events
pub mod store {
    pub const BATCH_APPLIED: &str = "batch.applied";
    pub const LOCK_ACQUIRED: &str = "lock.acquired";
    pub const LOCK_TIMEOUT: &str = "lock.timeout";
}

/// Activity ledger events
pub mod ledger {
    pub const ENTRY_APPENDED: &str = "entry.appended";
    pub const APPEND_FAILED: &str = "entry.append_failed";
    pub const APPEND_RETRIED: &str = "entry.append_retried";
    pub const APPEND_ABANDONED: &str = "entry.append_abandoned";
}

/// Broadcast hub events
pub mod hub {
    pub const HUB_STARTED: &str = "hub.started";
    pub const HUB_STOPPED: &str = "hub.stopped";
    pub const SESSION_OPENED: &str = "session.opened";
    pub const SESSION_CLOSED: &str = "session.closed";
    pub const SESSION_EVICTED: &str = "session.evicted";
    pub const ENTRY_PUBLISHED: &str = "entry.published";
    pub const ENTRY_DROPPED: &str = "entry.dropped";
}

/// Notification sink events
pub mod notifier {
    pub const NOTIFICATION_SENT: &str = "notification.sent";
    pub const NOTIFICATION_FAILED: &str = "notification.failed";
}
