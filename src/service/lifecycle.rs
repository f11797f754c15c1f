//! Project lifecycle transitions
//!
//! The project status is driven from outside: assignment by the work request
//! resolver, progress and completion by the task review cycle. Both
//! transitions here are pure decisions over a snapshot - they return the
//! updated project when the transition fires and `None` when it is already
//! satisfied, which is what makes the drivers idempotent.

use crate::domain::entity::{Project, ProjectStatus, Task, TaskStatus};

pub struct ProjectLifecycle;

impl ProjectLifecycle {
    /// ASSIGNED -> IN_PROGRESS when the first task is created
    ///
    /// No-op if the project already progressed past ASSIGNED.
    pub fn first_task_transition(project: &Project) -> Option<Project> {
        match project.status {
            ProjectStatus::Assigned => {
                let mut updated = project.clone();
                updated.status = ProjectStatus::InProgress;
                Some(updated)
            }
            _ => None
        }
    }

    /// -> COMPLETED when at least one task exists and none is incomplete
    ///
    /// `tasks` must be the full task set of the project as of the same
    /// snapshot. No-op when the project is already COMPLETED.
    pub fn completion_transition(project: &Project, tasks: &[Task]) -> Option<Project> {
        if !matches!(project.status, ProjectStatus::Assigned | ProjectStatus::InProgress) {
            return None;
        }
        if tasks.is_empty() || tasks.iter().any(|t| t.status != TaskStatus::Completed) {
            return None;
        }

        let mut updated = project.clone();
        updated.status = ProjectStatus::Completed;
        Some(updated)
    }
}
