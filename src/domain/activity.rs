//! Activity ledger records
//!
//! Every workflow mutation appends one immutable entry per logical event.
//! The ledger is both the audit trail and the source feeding the live
//! broadcast; entries are never mutated or deleted and keep commit order
//! within a project.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enumerated workflow verbs recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityAction {
    #[serde(rename = "PROJECT_CREATED")]
    ProjectCreated,
    #[serde(rename = "PROJECT_CANCELLED")]
    ProjectCancelled,
    #[serde(rename = "SOLVER_REQUESTED")]
    SolverRequested,
    #[serde(rename = "SOLVER_ASSIGNED")]
    SolverAssigned,
    #[serde(rename = "TASK_CREATED")]
    TaskCreated,
    #[serde(rename = "SUBMISSION_UPLOADED")]
    SubmissionUploaded,
    #[serde(rename = "SUBMISSION_ACCEPTED")]
    SubmissionAccepted,
    #[serde(rename = "SUBMISSION_REJECTED")]
    SubmissionRejected,
    #[serde(rename = "PROJECT_COMPLETED")]
    ProjectCompleted
}

impl Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            ActivityAction::ProjectCreated => "PROJECT_CREATED",
            ActivityAction::ProjectCancelled => "PROJECT_CANCELLED",
            ActivityAction::SolverRequested => "SOLVER_REQUESTED",
            ActivityAction::SolverAssigned => "SOLVER_ASSIGNED",
            ActivityAction::TaskCreated => "TASK_CREATED",
            ActivityAction::SubmissionUploaded => "SUBMISSION_UPLOADED",
            ActivityAction::SubmissionAccepted => "SUBMISSION_ACCEPTED",
            ActivityAction::SubmissionRejected => "SUBMISSION_REJECTED",
            ActivityAction::ProjectCompleted => "PROJECT_COMPLETED"
        };
        write!(f, "{}", action)
    }
}

/// One immutable record of a workflow event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unique entry identifier
    pub id:            String,
    /// What happened
    pub action:        ActivityAction,
    /// Who did it
    pub actor_id:      String,
    /// Project the event belongs to
    pub project_id:    String,
    /// Task involved, when the event is task-scoped
    pub task_id:       Option<String>,
    /// Submission involved, when the event is submission-scoped
    pub submission_id: Option<String>,
    /// Human-readable summary
    pub message:       String,
    /// Append timestamp
    pub created_at:    DateTime<Utc>
}

impl ActivityEntry {
    pub fn new(
        action: ActivityAction,
        actor_id: impl Into<String>,
        project_id: impl Into<String>,
        message: impl Into<String>
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action,
            actor_id: actor_id.into(),
            project_id: project_id.into(),
            task_id: None,
            submission_id: None,
            message: message.into(),
            created_at: Utc::now()
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_submission_id(mut self, submission_id: impl Into<String>) -> Self {
        self.submission_id = Some(submission_id.into());
        self
    }
}
