//! Marketplace entities and their status machines
//!
//! Projects, work requests, tasks and submissions are mutated only through
//! the service operations; everything here is plain data plus the status
//! predicates those operations rely on.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project status progression
///
/// OPEN -> ASSIGNED -> IN_PROGRESS -> COMPLETED, with CANCELLED reachable
/// only from OPEN. A project is never deleted once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "CANCELLED")]
    Cancelled
}

impl ProjectStatus {
    /// Statuses that require an assigned solver
    pub fn requires_assignment(&self) -> bool {
        matches!(self, ProjectStatus::Assigned | ProjectStatus::InProgress | ProjectStatus::Completed)
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            ProjectStatus::Open => "OPEN",
            ProjectStatus::Assigned => "ASSIGNED",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED"
        };
        write!(f, "{}", status)
    }
}

/// A buyer-posted project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    pub id:                 String,
    /// Short human-readable title
    pub title:              String,
    /// Full description of the work
    pub description:        String,
    /// Skills the buyer is looking for
    pub skills_required:    Vec<String>,
    /// Optional budget in the marketplace currency
    pub budget:             Option<u64>,
    /// Optional delivery deadline
    pub deadline:           Option<DateTime<Utc>>,
    /// Owning buyer
    pub buyer_id:           String,
    /// Solver the project is assigned to, set by accepting a work request
    pub assigned_solver_id: Option<String>,
    /// Current lifecycle status
    pub status:             ProjectStatus,
    /// Creation timestamp
    pub created_at:         DateTime<Utc>
}

impl Project {
    /// Invariant: `assigned_solver_id` is non-null iff the status requires an
    /// assignment
    pub fn assignment_consistent(&self) -> bool {
        self.assigned_solver_id.is_some() == self.status.requires_assignment()
    }

    /// Whether `solver_id` is the solver currently assigned to this project
    pub fn is_assigned_to(&self, solver_id: &str) -> bool {
        self.assigned_solver_id.as_deref() == Some(solver_id)
    }
}

/// Work request status; ACCEPTED and REJECTED are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REJECTED")]
    Rejected
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::Rejected => "REJECTED"
        };
        write!(f, "{}", status)
    }
}

/// A solver's proposal to work on an open project
///
/// Unique per (project_id, solver_id); at most one ACCEPTED request exists
/// for a given project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Unique request identifier
    pub id:         String,
    /// Project the request targets
    pub project_id: String,
    /// Requesting solver
    pub solver_id:  String,
    /// Optional proposal text shown to the buyer
    pub proposal:   Option<String>,
    /// Current status
    pub status:     RequestStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>
}

impl WorkRequest {
    pub fn new(project_id: impl Into<String>, solver_id: impl Into<String>, proposal: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            solver_id: solver_id.into(),
            proposal,
            status: RequestStatus::Pending,
            created_at: Utc::now()
        }
    }
}

/// Task status progression
///
/// IN_PROGRESS -> SUBMITTED -> (COMPLETED | REJECTED); REJECTED returns the
/// task to the solver for rework and permits resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "SUBMITTED")]
    Submitted,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "COMPLETED")]
    Completed
}

impl TaskStatus {
    /// Statuses from which the solver may (re)submit a deliverable
    pub fn is_submittable(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Rejected)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Rejected => "REJECTED",
            TaskStatus::Completed => "COMPLETED"
        };
        write!(f, "{}", status)
    }
}

/// A unit of work the assigned solver decomposed the project into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id:          String,
    /// Owning project
    pub project_id:  String,
    /// Solver the task belongs to; equals the project's assigned solver at
    /// creation time
    pub solver_id:   String,
    /// Short human-readable title
    pub title:       String,
    /// Description of the deliverable
    pub description: String,
    /// Optional per-task deadline
    pub deadline:    Option<DateTime<Utc>>,
    /// Current status
    pub status:      TaskStatus,
    /// Creation timestamp
    pub created_at:  DateTime<Utc>
}

/// Submission review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "SUBMITTED")]
    Submitted,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REJECTED")]
    Rejected
}

impl Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Accepted => "ACCEPTED",
            SubmissionStatus::Rejected => "REJECTED"
        };
        write!(f, "{}", status)
    }
}

/// A deliverable uploaded against a task
///
/// Tasks accumulate submissions over resubmission rounds; only the latest one
/// by creation order is eligible for review and history is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission identifier
    pub id:              String,
    /// Task the deliverable belongs to
    pub task_id:         String,
    /// Submitting solver
    pub solver_id:       String,
    /// Durable reference produced by blob storage
    pub artifact_ref:    String,
    /// Original file name, when known
    pub artifact_name:   Option<String>,
    /// Review status
    pub status:          SubmissionStatus,
    /// Reviewer comments; required when the review rejects
    pub review_comments: Option<String>,
    /// Creation timestamp; also the review ordering key
    pub created_at:      DateTime<Utc>
}

impl Submission {
    pub fn new(
        task_id: impl Into<String>,
        solver_id: impl Into<String>,
        artifact_ref: impl Into<String>,
        artifact_name: Option<String>
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            solver_id: solver_id.into(),
            artifact_ref: artifact_ref.into(),
            artifact_name,
            status: SubmissionStatus::Submitted,
            review_comments: None,
            created_at: Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_invariant_tracks_status() {
        let mut project = Project {
            id: Uuid::new_v4().to_string(),
            title: "Landing page".to_string(),
            description: "Build the landing page".to_string(),
            skills_required: vec!["design".to_string()],
            budget: Some(500),
            deadline: None,
            buyer_id: "buyer-1".to_string(),
            assigned_solver_id: None,
            status: ProjectStatus::Open,
            created_at: Utc::now()
        };
        assert!(project.assignment_consistent());

        project.status = ProjectStatus::Assigned;
        assert!(!project.assignment_consistent());

        project.assigned_solver_id = Some("solver-1".to_string());
        assert!(project.assignment_consistent());

        project.status = ProjectStatus::Completed;
        assert!(project.assignment_consistent());
    }

    #[test]
    fn submittable_statuses() {
        assert!(TaskStatus::InProgress.is_submittable());
        assert!(TaskStatus::Rejected.is_submittable());
        assert!(!TaskStatus::Submitted.is_submittable());
        assert!(!TaskStatus::Completed.is_submittable());
    }
}
