//! Task and submission review cycle
//!
//! The assigned solver decomposes the project into tasks, submits
//! deliverables and the buyer reviews them. Review rounds accumulate
//! submissions; only the latest one is ever reviewed. Accepting the last
//! outstanding task folds the project completion transition into the same
//! atomic commit.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    broadcast::EventBroadcaster,
    domain::{
        activity::{ActivityAction, ActivityEntry},
        constant::workflow,
        entity::{ProjectStatus, Submission, Task, TaskStatus},
        error::MarketError,
        identity::{Actor, Role},
        input::{CreateTaskInput, Page, PageMeta, Paged, ReviewDecision, ReviewTaskInput, SubmitTaskInput},
        policy::{self, Capability, ProjectAccess, Snapshot}
    },
    port::{
        blob::BlobStore,
        ledger::Ledger,
        notifier::Notifier,
        store::{EntityStore, WriteBatch}
    },
    service::{lifecycle::ProjectLifecycle, notify_after_commit, record_and_publish}
};

/// Service owning the per-task submission/review rounds
pub struct TaskService {
    store:       Arc<dyn EntityStore>,
    ledger:      Arc<dyn Ledger>,
    broadcaster: EventBroadcaster,
    notifier:    Arc<dyn Notifier>,
    blobs:       Arc<dyn BlobStore>,
    page_limit:  usize
}

impl TaskService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        ledger: Arc<dyn Ledger>,
        broadcaster: EventBroadcaster,
        notifier: Arc<dyn Notifier>,
        blobs: Arc<dyn BlobStore>,
        page_limit: usize
    ) -> Self {
        Self { store, ledger, broadcaster, notifier, blobs, page_limit }
    }

    /// The assigned solver carves a task out of the project
    ///
    /// Creating the first task moves an ASSIGNED project to IN_PROGRESS in
    /// the same commit.
    pub async fn create_task(&self, actor: &Actor, input: CreateTaskInput) -> Result<Task, MarketError> {
        input.validate()?;

        let lease = self.store.lock_project(&input.project_id).await?;
        let project = self
            .store
            .get_project(&input.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::CreateTask, Snapshot::project(&project))?;

        let solver_id = match (&project.status, &project.assigned_solver_id) {
            (ProjectStatus::Assigned | ProjectStatus::InProgress, Some(solver_id)) => solver_id.clone(),
            _ => {
                return Err(MarketError::Conflict(format!(
                    "Tasks can only be created on an assigned project, status is {}",
                    project.status
                )));
            }
        };

        let task = Task {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            solver_id,
            title: input.title,
            description: input.description,
            deadline: input.deadline,
            status: TaskStatus::InProgress,
            created_at: Utc::now()
        };

        let mut batch = WriteBatch::new().put_task(task.clone());
        let project = match ProjectLifecycle::first_task_transition(&project) {
            Some(updated) => {
                batch = batch.put_project(updated.clone());
                updated
            }
            None => project
        };

        self.store.apply(batch).await?;

        let entry = ActivityEntry::new(
            ActivityAction::TaskCreated,
            &actor.id,
            &project.id,
            format!("Task {} created", task.title)
        )
        .with_task_id(&task.id);
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        event!(Level::DEBUG, event = workflow::TASK_CREATED,
               task_id = %task.id, project_id = %project.id);
        Ok(task)
    }

    /// Store deliverable bytes, returning the durable reference to submit
    pub async fn upload_artifact(&self, name: &str, bytes: &[u8]) -> Result<String, MarketError> {
        self.blobs.store(name, bytes).await
    }

    /// The task owner uploads a deliverable for review
    ///
    /// Allowed while the task is IN_PROGRESS or REJECTED; prior submissions
    /// are preserved untouched.
    pub async fn submit_task(&self, actor: &Actor, input: SubmitTaskInput) -> Result<Submission, MarketError> {
        input.validate()?;

        let probe = self
            .store
            .get_task(&input.task_id)
            .await?
            .ok_or(MarketError::NotFound("Task not found".to_string()))?;

        let lease = self.store.lock_project(&probe.project_id).await?;
        let mut task = self
            .store
            .get_task(&input.task_id)
            .await?
            .ok_or(MarketError::NotFound("Task not found".to_string()))?;
        let project = self
            .store
            .get_project(&task.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::SubmitTask, Snapshot::task(&project, &task))?;

        if !task.status.is_submittable() {
            return Err(MarketError::Conflict(format!(
                "Task must be IN_PROGRESS or REJECTED to submit, status is {}",
                task.status
            )));
        }

        let submission = Submission::new(&task.id, &task.solver_id, input.artifact_ref, input.artifact_name);
        task.status = TaskStatus::Submitted;

        self.store
            .apply(WriteBatch::new().put_submission(submission.clone()).put_task(task.clone()))
            .await?;

        let entry = ActivityEntry::new(
            ActivityAction::SubmissionUploaded,
            &actor.id,
            &project.id,
            format!("Task {} submitted for review", task.title)
        )
        .with_task_id(&task.id)
        .with_submission_id(&submission.id);
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        notify_after_commit(
            self.notifier.clone(),
            project.buyer_id.clone(),
            "Task Submitted".to_string(),
            format!("Task {} has been submitted for review on project {}.", task.title, project.title)
        );

        event!(Level::DEBUG, event = workflow::TASK_SUBMITTED,
               task_id = %task.id, submission_id = %submission.id);
        Ok(submission)
    }

    /// The buyer reviews the latest submission of a SUBMITTED task
    ///
    /// ACCEPTED completes the task and runs the project completion check in
    /// the same commit; REJECTED returns the task to the solver for rework.
    pub async fn review_task(&self, actor: &Actor, input: ReviewTaskInput) -> Result<Submission, MarketError> {
        input.validate()?;

        let probe = self
            .store
            .get_task(&input.task_id)
            .await?
            .ok_or(MarketError::NotFound("Task not found".to_string()))?;

        let lease = self.store.lock_project(&probe.project_id).await?;
        let mut task = self
            .store
            .get_task(&input.task_id)
            .await?
            .ok_or(MarketError::NotFound("Task not found".to_string()))?;
        let project = self
            .store
            .get_project(&task.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ReviewTask, Snapshot::task(&project, &task))?;

        if task.status != TaskStatus::Submitted {
            return Err(MarketError::Conflict(format!(
                "Task is not in SUBMITTED state, status is {}",
                task.status
            )));
        }

        // Only the newest submission is ever reviewed
        let mut submission = self
            .store
            .latest_submission(&task.id)
            .await?
            .ok_or(MarketError::Conflict("No submission found for this task".to_string()))?;

        submission.status = input.decision.submission_status();
        submission.review_comments = input.comments.clone();

        let (action, completed_project) = match input.decision {
            ReviewDecision::Accepted => {
                task.status = TaskStatus::Completed;

                // Recompute completion over the task set as of this commit
                let mut tasks = self.store.list_tasks_for_project(&project.id).await?;
                for t in tasks.iter_mut() {
                    if t.id == task.id {
                        t.status = TaskStatus::Completed;
                    }
                }
                (ActivityAction::SubmissionAccepted, ProjectLifecycle::completion_transition(&project, &tasks))
            }
            ReviewDecision::Rejected => {
                task.status = TaskStatus::Rejected;
                (ActivityAction::SubmissionRejected, None)
            }
        };

        let mut batch = WriteBatch::new().put_submission(submission.clone()).put_task(task.clone());
        if let Some(completed) = &completed_project {
            batch = batch.put_project(completed.clone());
        }
        self.store.apply(batch).await?;

        let project = completed_project.clone().unwrap_or(project);
        let access = ProjectAccess::of(&project);

        let entry = ActivityEntry::new(
            action,
            &actor.id,
            &project.id,
            match input.decision {
                ReviewDecision::Accepted => format!("Task {} accepted", task.title),
                ReviewDecision::Rejected => format!("Task {} rejected", task.title)
            }
        )
        .with_task_id(&task.id)
        .with_submission_id(&submission.id);
        record_and_publish(&self.ledger, &self.broadcaster, entry, &access).await;

        if completed_project.is_some() {
            let entry = ActivityEntry::new(
                ActivityAction::ProjectCompleted,
                &actor.id,
                &project.id,
                format!("Project {} completed", project.title)
            );
            record_and_publish(&self.ledger, &self.broadcaster, entry, &access).await;
            event!(Level::DEBUG, event = workflow::PROJECT_COMPLETED, project_id = %project.id);
        }
        drop(lease);

        let (subject, body) = match input.decision {
            ReviewDecision::Accepted => (
                "Task Accepted".to_string(),
                format!("Your submission for task {} has been accepted.", task.title)
            ),
            ReviewDecision::Rejected => (
                "Task Rejected".to_string(),
                format!(
                    "Your submission for task {} has been rejected. Comments: {}. Please revise and resubmit.",
                    task.title,
                    input.comments.as_deref().unwrap_or("")
                )
            )
        };
        notify_after_commit(self.notifier.clone(), task.solver_id.clone(), subject, body);

        event!(Level::DEBUG, event = workflow::TASK_REVIEWED,
               task_id = %task.id, decision = ?input.decision);
        Ok(submission)
    }

    /// The newest submission of a task, gated by project access
    pub async fn latest_submission(&self, actor: &Actor, task_id: &str) -> Result<Option<Submission>, MarketError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(MarketError::NotFound("Task not found".to_string()))?;
        let project = self
            .store
            .get_project(&task.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ViewActivity, Snapshot::project(&project))?;
        self.store.latest_submission(task_id).await
    }

    /// Role-scoped task listing: solvers see their own, buyers see their
    /// projects', admins see everything
    pub async fn list_tasks(&self, actor: &Actor, page: Page) -> Result<Paged<Task>, MarketError> {
        let tasks = match actor.role {
            Role::Solver => self.store.list_tasks_for_solver(&actor.id).await?,
            Role::Buyer => self.store.list_tasks_for_buyer(&actor.id).await?,
            Role::Admin => {
                let mut all = Vec::new();
                for project in self.store.list_projects().await? {
                    all.extend(self.store.list_tasks_for_project(&project.id).await?);
                }
                all
            }
        };

        let total = tasks.len();
        let (skip, limit) = page.normalized(self.page_limit);

        Ok(Paged {
            meta: PageMeta { page: page.page.max(1), limit, total },
            data: tasks.into_iter().skip(skip).take(limit).collect()
        })
    }
}
