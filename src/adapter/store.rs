//! In-memory entity store
//!
//! Hash-map state behind a single `RwLock`; a `WriteBatch` is applied under
//! one write-lock acquisition so readers never observe partial application.
//! Per-project pessimistic locks live in a registry of `tokio::sync::Mutex`
//! handles and are acquired with a bounded wait.
//!
//! Suitable for development and testing; production deployments put a
//! transactional relational store behind the same port.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::Duration
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{Level, event};

use crate::{
    domain::{
        constant::store,
        entity::{Project, Submission, Task, WorkRequest},
        error::MarketError
    },
    port::store::{EntityStore, Mutation, ProjectLease, WriteBatch}
};

#[derive(Debug, Default)]
struct StoreState {
    projects:    HashMap<String, Project>,
    requests:    HashMap<String, WorkRequest>,
    tasks:       HashMap<String, Task>,
    submissions: HashMap<String, Submission>,
    /// Submission ids per task in insertion order; review updates re-put an
    /// existing id and must not disturb the order
    task_order:  HashMap<String, Vec<String>>
}

/// In-memory `EntityStore` implementation
pub struct InMemoryStore {
    state:        Arc<RwLock<StoreState>>,
    locks:        Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
    lock_timeout: Duration
}

impl InMemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state:        Arc::new(RwLock::new(StoreState::default())),
            locks:        Arc::new(StdMutex::new(HashMap::new())),
            lock_timeout
        }
    }

    fn lock_handle(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(project_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
    where
        F: Fn(&T) -> (chrono::DateTime<chrono::Utc>, String)
    {
        items.sort_by(|a, b| key(b).cmp(&key(a)));
        items
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn lock_project(&self, project_id: &str) -> Result<ProjectLease, MarketError> {
        let handle = self.lock_handle(project_id);

        match tokio::time::timeout(self.lock_timeout, handle.lock_owned()).await {
            Ok(guard) => {
                event!(Level::DEBUG, event = store::LOCK_ACQUIRED, project_id = %project_id);
                Ok(ProjectLease::new(project_id, guard))
            }
            Err(_) => {
                event!(Level::WARN, event = store::LOCK_TIMEOUT, project_id = %project_id,
                       timeout_ms = %self.lock_timeout.as_millis());
                Err(MarketError::LockTimeout(format!(
                    "Could not acquire project lock for {} within {}ms",
                    project_id,
                    self.lock_timeout.as_millis()
                )))
            }
        }
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), MarketError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mutation_count = batch.mutations.len();
        let mut state = self.state.write().await;

        for mutation in batch.mutations {
            match mutation {
                Mutation::PutProject(project) => {
                    state.projects.insert(project.id.clone(), project);
                }
                Mutation::PutRequest(request) => {
                    state.requests.insert(request.id.clone(), request);
                }
                Mutation::PutTask(task) => {
                    state.tasks.insert(task.id.clone(), task);
                }
                Mutation::PutSubmission(submission) => {
                    let order = state.task_order.entry(submission.task_id.clone()).or_default();
                    if !order.iter().any(|id| id == &submission.id) {
                        order.push(submission.id.clone());
                    }
                    state.submissions.insert(submission.id.clone(), submission);
                }
            }
        }

        event!(Level::DEBUG, event = store::BATCH_APPLIED, mutations = %mutation_count);
        Ok(())
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, MarketError> {
        let state = self.state.read().await;
        Ok(state.projects.get(id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, MarketError> {
        let state = self.state.read().await;
        let projects = state.projects.values().cloned().collect();
        Ok(Self::newest_first(projects, |p: &Project| (p.created_at, p.id.clone())))
    }

    async fn get_request(&self, id: &str) -> Result<Option<WorkRequest>, MarketError> {
        let state = self.state.read().await;
        Ok(state.requests.get(id).cloned())
    }

    async fn find_request(&self, project_id: &str, solver_id: &str) -> Result<Option<WorkRequest>, MarketError> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .find(|r| r.project_id == project_id && r.solver_id == solver_id)
            .cloned())
    }

    async fn list_requests_for_project(&self, project_id: &str) -> Result<Vec<WorkRequest>, MarketError> {
        let state = self.state.read().await;
        let requests = state.requests.values().filter(|r| r.project_id == project_id).cloned().collect();
        Ok(Self::newest_first(requests, |r: &WorkRequest| (r.created_at, r.id.clone())))
    }

    async fn list_requests_for_solver(&self, solver_id: &str) -> Result<Vec<WorkRequest>, MarketError> {
        let state = self.state.read().await;
        let requests = state.requests.values().filter(|r| r.solver_id == solver_id).cloned().collect();
        Ok(Self::newest_first(requests, |r: &WorkRequest| (r.created_at, r.id.clone())))
    }

    async fn list_requests_for_buyer(&self, buyer_id: &str) -> Result<Vec<WorkRequest>, MarketError> {
        let state = self.state.read().await;
        let requests = state
            .requests
            .values()
            .filter(|r| state.projects.get(&r.project_id).is_some_and(|p| p.buyer_id == buyer_id))
            .cloned()
            .collect();
        Ok(Self::newest_first(requests, |r: &WorkRequest| (r.created_at, r.id.clone())))
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, MarketError> {
        let state = self.state.read().await;
        Ok(state.tasks.get(id).cloned())
    }

    async fn list_tasks_for_project(&self, project_id: &str) -> Result<Vec<Task>, MarketError> {
        let state = self.state.read().await;
        let tasks = state.tasks.values().filter(|t| t.project_id == project_id).cloned().collect();
        Ok(Self::newest_first(tasks, |t: &Task| (t.created_at, t.id.clone())))
    }

    async fn list_tasks_for_solver(&self, solver_id: &str) -> Result<Vec<Task>, MarketError> {
        let state = self.state.read().await;
        let tasks = state.tasks.values().filter(|t| t.solver_id == solver_id).cloned().collect();
        Ok(Self::newest_first(tasks, |t: &Task| (t.created_at, t.id.clone())))
    }

    async fn list_tasks_for_buyer(&self, buyer_id: &str) -> Result<Vec<Task>, MarketError> {
        let state = self.state.read().await;
        let tasks = state
            .tasks
            .values()
            .filter(|t| state.projects.get(&t.project_id).is_some_and(|p| p.buyer_id == buyer_id))
            .cloned()
            .collect();
        Ok(Self::newest_first(tasks, |t: &Task| (t.created_at, t.id.clone())))
    }

    async fn list_submissions_for_task(&self, task_id: &str) -> Result<Vec<Submission>, MarketError> {
        let state = self.state.read().await;
        let ids = state.task_order.get(task_id).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|id| state.submissions.get(id).cloned()).collect())
    }

    async fn latest_submission(&self, task_id: &str) -> Result<Option<Submission>, MarketError> {
        let state = self.state.read().await;
        let latest = state
            .task_order
            .get(task_id)
            .and_then(|ids| ids.last())
            .and_then(|id| state.submissions.get(id).cloned());
        Ok(latest)
    }
}
