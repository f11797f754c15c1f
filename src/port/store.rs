//! Entity storage port
//!
//! Every workflow mutation travels through this port as a single
//! `WriteBatch`, applied atomically: a reader never observes some mutations
//! of a batch without the others. Multi-entity transitions additionally hold
//! a project-scoped `ProjectLease` across their read-check-write sequence so
//! concurrent writers to the same project serialize.

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::domain::{
    entity::{Project, Submission, Task, WorkRequest},
    error::MarketError
};

/// Exclusive per-project write lease
///
/// Held by a workflow operation for the duration of its read-check-write
/// sequence; dropped (releasing the lock) once the batch is applied, the
/// ledger entries are appended and the broadcast is enqueued. Acquisition is
/// bounded; see `EntityStore::lock_project`.
pub struct ProjectLease {
    project_id: String,
    _guard:     OwnedMutexGuard<()>
}

impl ProjectLease {
    pub fn new(project_id: impl Into<String>, guard: OwnedMutexGuard<()>) -> Self {
        Self { project_id: project_id.into(), _guard: guard }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// One entity write inside a batch
#[derive(Debug, Clone)]
pub enum Mutation {
    PutProject(Project),
    PutRequest(WorkRequest),
    PutTask(Task),
    PutSubmission(Submission)
}

/// An all-or-nothing set of entity writes
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub mutations: Vec<Mutation>
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_project(mut self, project: Project) -> Self {
        self.mutations.push(Mutation::PutProject(project));
        self
    }

    pub fn put_request(mut self, request: WorkRequest) -> Self {
        self.mutations.push(Mutation::PutRequest(request));
        self
    }

    pub fn put_task(mut self, task: Task) -> Self {
        self.mutations.push(Mutation::PutTask(task));
        self
    }

    pub fn put_submission(mut self, submission: Submission) -> Self {
        self.mutations.push(Mutation::PutSubmission(submission));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Port for entity reads, atomic batch writes and project-scoped locking
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Acquire the exclusive write lease for a project
    ///
    /// Waits at most the store's configured window; exceeding it yields a
    /// retryable `LockTimeout` instead of blocking unbounded.
    async fn lock_project(&self, project_id: &str) -> Result<ProjectLease, MarketError>;

    /// Apply all mutations of a batch in one atomic step
    async fn apply(&self, batch: WriteBatch) -> Result<(), MarketError>;

    async fn get_project(&self, id: &str) -> Result<Option<Project>, MarketError>;

    /// All projects, newest first
    async fn list_projects(&self) -> Result<Vec<Project>, MarketError>;

    async fn get_request(&self, id: &str) -> Result<Option<WorkRequest>, MarketError>;

    /// The unique request a solver holds against a project, if any
    async fn find_request(&self, project_id: &str, solver_id: &str) -> Result<Option<WorkRequest>, MarketError>;

    /// All requests targeting a project, newest first
    async fn list_requests_for_project(&self, project_id: &str) -> Result<Vec<WorkRequest>, MarketError>;

    /// All requests a solver has made, newest first
    async fn list_requests_for_solver(&self, solver_id: &str) -> Result<Vec<WorkRequest>, MarketError>;

    /// All requests against any project owned by a buyer, newest first
    async fn list_requests_for_buyer(&self, buyer_id: &str) -> Result<Vec<WorkRequest>, MarketError>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>, MarketError>;

    /// All tasks of a project, newest first
    async fn list_tasks_for_project(&self, project_id: &str) -> Result<Vec<Task>, MarketError>;

    /// All tasks a solver owns, newest first
    async fn list_tasks_for_solver(&self, solver_id: &str) -> Result<Vec<Task>, MarketError>;

    /// All tasks under any project owned by a buyer, newest first
    async fn list_tasks_for_buyer(&self, buyer_id: &str) -> Result<Vec<Task>, MarketError>;

    /// Submissions of a task in creation order (oldest first)
    async fn list_submissions_for_task(&self, task_id: &str) -> Result<Vec<Submission>, MarketError>;

    /// The submission with the greatest creation order for a task
    async fn latest_submission(&self, task_id: &str) -> Result<Option<Submission>, MarketError>;
}
