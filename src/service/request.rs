//! Work request resolver - proposal and acceptance between solvers and open
//! projects
//!
//! `accept_work` is the most delicate transaction in the system: the target
//! request, every other pending request and the project itself move together
//! in one batch under the project lease, so a reader can never observe an
//! accepted request without the matching assignment. Two concurrent accepts
//! serialize on the lease; the loser re-reads a project that is no longer
//! OPEN and surfaces Conflict.

use std::sync::Arc;

use tracing::{Level, event};

use crate::{
    broadcast::EventBroadcaster,
    domain::{
        activity::{ActivityAction, ActivityEntry},
        constant::workflow,
        entity::{ProjectStatus, RequestStatus, WorkRequest},
        error::MarketError,
        identity::{Actor, Role},
        input::{Page, PageMeta, Paged, RequestWorkInput},
        policy::{self, Capability, ProjectAccess, Snapshot}
    },
    port::{ledger::Ledger, notifier::Notifier, store::{EntityStore, WriteBatch}},
    service::{notify_after_commit, record_and_publish}
};

/// Service resolving solver proposals against open projects
pub struct WorkRequestService {
    store:       Arc<dyn EntityStore>,
    ledger:      Arc<dyn Ledger>,
    broadcaster: EventBroadcaster,
    notifier:    Arc<dyn Notifier>,
    page_limit:  usize
}

impl WorkRequestService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        ledger: Arc<dyn Ledger>,
        broadcaster: EventBroadcaster,
        notifier: Arc<dyn Notifier>,
        page_limit: usize
    ) -> Self {
        Self { store, ledger, broadcaster, notifier, page_limit }
    }

    /// A solver proposes to work on an OPEN project
    pub async fn request_work(&self, actor: &Actor, input: RequestWorkInput) -> Result<WorkRequest, MarketError> {
        input.validate()?;
        policy::authorize(actor, Capability::RequestProject, Snapshot::none())?;

        let lease = self.store.lock_project(&input.project_id).await?;
        let project = self
            .store
            .get_project(&input.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        if project.status != ProjectStatus::Open {
            return Err(MarketError::Conflict("Project is not open for proposals".to_string()));
        }

        if self.store.find_request(&project.id, &actor.id).await?.is_some() {
            return Err(MarketError::Conflict(
                "You have already submitted a request for this project".to_string()
            ));
        }

        let request = WorkRequest::new(&project.id, &actor.id, input.proposal);
        self.store.apply(WriteBatch::new().put_request(request.clone())).await?;

        let entry = ActivityEntry::new(
            ActivityAction::SolverRequested,
            &actor.id,
            &project.id,
            format!("Solver requested to work on project {}", project.title)
        );
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        notify_after_commit(
            self.notifier.clone(),
            project.buyer_id.clone(),
            "New Project Request".to_string(),
            format!("A solver has requested to work on your project \"{}\".", project.title)
        );

        event!(Level::DEBUG, event = workflow::REQUEST_CREATED,
               request_id = %request.id, project_id = %project.id, solver_id = %actor.id);
        Ok(request)
    }

    /// The buyer accepts one pending request, rejecting all others and
    /// assigning the project in the same atomic step
    pub async fn accept_work(&self, actor: &Actor, request_id: &str) -> Result<WorkRequest, MarketError> {
        // First read resolves the project id; everything is re-read and
        // re-checked under the lease
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(MarketError::NotFound("Work request not found".to_string()))?;

        let lease = self.store.lock_project(&request.project_id).await?;

        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(MarketError::NotFound("Work request not found".to_string()))?;
        let mut project = self
            .store
            .get_project(&request.project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::AcceptRequest, Snapshot::project(&project))?;

        if project.status != ProjectStatus::Open {
            return Err(MarketError::Conflict("Project is already assigned or closed".to_string()));
        }
        if request.status != RequestStatus::Pending {
            return Err(MarketError::Conflict(format!("Work request is already {}", request.status)));
        }

        let mut accepted = request.clone();
        accepted.status = RequestStatus::Accepted;

        let mut batch = WriteBatch::new().put_request(accepted.clone());
        for other in self.store.list_requests_for_project(&project.id).await? {
            if other.id != accepted.id && other.status == RequestStatus::Pending {
                let mut rejected = other;
                rejected.status = RequestStatus::Rejected;
                batch = batch.put_request(rejected);
            }
        }

        project.assigned_solver_id = Some(accepted.solver_id.clone());
        project.status = ProjectStatus::Assigned;
        batch = batch.put_project(project.clone());

        self.store.apply(batch).await?;

        let entry = ActivityEntry::new(
            ActivityAction::SolverAssigned,
            &actor.id,
            &project.id,
            format!("Buyer accepted request from solver for project {}", project.title)
        );
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        notify_after_commit(
            self.notifier.clone(),
            accepted.solver_id.clone(),
            "Request Accepted".to_string(),
            format!("Congratulations! Your request for project \"{}\" has been accepted.", project.title)
        );

        event!(Level::DEBUG, event = workflow::REQUEST_ACCEPTED,
               request_id = %accepted.id, project_id = %project.id, solver_id = %accepted.solver_id);
        Ok(accepted)
    }

    /// Role-scoped request listing: solvers see their own, buyers see those
    /// against their projects, admins see everything
    pub async fn list_requests(&self, actor: &Actor, page: Page) -> Result<Paged<WorkRequest>, MarketError> {
        let requests = match actor.role {
            Role::Solver => self.store.list_requests_for_solver(&actor.id).await?,
            Role::Buyer => self.store.list_requests_for_buyer(&actor.id).await?,
            Role::Admin => {
                let mut all = Vec::new();
                for project in self.store.list_projects().await? {
                    all.extend(self.store.list_requests_for_project(&project.id).await?);
                }
                all
            }
        };

        let total = requests.len();
        let (skip, limit) = page.normalized(self.page_limit);

        Ok(Paged {
            meta: PageMeta { page: page.page.max(1), limit, total },
            data: requests.into_iter().skip(skip).take(limit).collect()
        })
    }

    /// Requests against one project; owner or admin only
    pub async fn list_requests_for_project(
        &self,
        actor: &Actor,
        project_id: &str
    ) -> Result<Vec<WorkRequest>, MarketError> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ManageProject, Snapshot::project(&project))?;
        self.store.list_requests_for_project(project_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        adapter::{ledger::InMemoryLedger, notifier::TracingNotifier, store::InMemoryStore},
        domain::{entity::Project, input::CreateProjectInput},
        service::project::ProjectService
    };

    struct Fixture {
        store:    Arc<dyn EntityStore>,
        ledger:   Arc<dyn Ledger>,
        projects: ProjectService,
        requests: Arc<WorkRequestService>
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn EntityStore> = Arc::new(InMemoryStore::new(Duration::from_secs(1)));
        let ledger: Arc<dyn Ledger> = Arc::new(InMemoryLedger::new());
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new());

        let projects = ProjectService::new(store.clone(), ledger.clone(), broadcaster.clone(), 100);
        let requests = Arc::new(WorkRequestService::new(
            store.clone(),
            ledger.clone(),
            broadcaster,
            notifier,
            100
        ));

        Fixture { store, ledger, projects, requests }
    }

    async fn open_project(fixture: &Fixture, buyer: &Actor) -> Project {
        fixture
            .projects
            .create_project(
                buyer,
                CreateProjectInput {
                    title: "Realtime dashboard".to_string(),
                    description: "Build the dashboard with live updates for the marketplace".to_string(),
                    skills_required: vec!["rust".to_string()],
                    budget: Some(1000),
                    deadline: None
                }
            )
            .await
            .unwrap()
    }

    fn request_input(project_id: &str) -> RequestWorkInput {
        RequestWorkInput { project_id: project_id.to_string(), proposal: Some("I can do this".to_string()) }
    }

    #[tokio::test]
    async fn request_requires_an_open_project() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let project = open_project(&f, &buyer).await;

        f.projects.cancel_project(&buyer, &project.id).await.unwrap();

        let err = f.requests.request_work(&Actor::solver("solver-1"), request_input(&project.id)).await.unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_request_per_solver_is_a_conflict() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let solver = Actor::solver("solver-1");
        let project = open_project(&f, &buyer).await;

        f.requests.request_work(&solver, request_input(&project.id)).await.unwrap();
        let err = f.requests.request_work(&solver, request_input(&project.id)).await.unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));
    }

    #[tokio::test]
    async fn accept_assigns_project_and_rejects_the_rest() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let project = open_project(&f, &buyer).await;

        let r1 = f.requests.request_work(&Actor::solver("solver-1"), request_input(&project.id)).await.unwrap();
        let r2 = f.requests.request_work(&Actor::solver("solver-2"), request_input(&project.id)).await.unwrap();

        let accepted = f.requests.accept_work(&buyer, &r1.id).await.unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);

        let rejected = f.store.get_request(&r2.id).await.unwrap().unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);

        let assigned = f.store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(assigned.status, ProjectStatus::Assigned);
        assert_eq!(assigned.assigned_solver_id.as_deref(), Some("solver-1"));
        assert!(assigned.assignment_consistent());

        // One SOLVER_ASSIGNED entry followed the two SOLVER_REQUESTED ones
        let entries = f.ledger.list_for_project(&project.id).await.unwrap();
        let assigned_entries: Vec<_> =
            entries.iter().filter(|e| e.action == ActivityAction::SolverAssigned).collect();
        assert_eq!(assigned_entries.len(), 1);
    }

    #[tokio::test]
    async fn accept_is_owner_gated() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let project = open_project(&f, &buyer).await;
        let request = f.requests.request_work(&Actor::solver("solver-1"), request_input(&project.id)).await.unwrap();

        let err = f.requests.accept_work(&Actor::buyer("buyer-2"), &request.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));
    }

    #[tokio::test]
    async fn second_accept_on_the_same_project_is_a_conflict() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let project = open_project(&f, &buyer).await;

        let r1 = f.requests.request_work(&Actor::solver("solver-1"), request_input(&project.id)).await.unwrap();
        let r2 = f.requests.request_work(&Actor::solver("solver-2"), request_input(&project.id)).await.unwrap();

        f.requests.accept_work(&buyer, &r1.id).await.unwrap();
        let err = f.requests.accept_work(&buyer, &r2.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_accepts_serialize_to_one_winner() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let project = open_project(&f, &buyer).await;

        let r1 = f.requests.request_work(&Actor::solver("solver-1"), request_input(&project.id)).await.unwrap();
        let r2 = f.requests.request_work(&Actor::solver("solver-2"), request_input(&project.id)).await.unwrap();

        let svc_a = f.requests.clone();
        let svc_b = f.requests.clone();
        let buyer_a = buyer.clone();
        let buyer_b = buyer.clone();
        let id_a = r1.id.clone();
        let id_b = r2.id.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { svc_a.accept_work(&buyer_a, &id_a).await }),
            tokio::spawn(async move { svc_b.accept_work(&buyer_b, &id_b).await })
        );
        let results = [a.unwrap(), b.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts =
            results.iter().filter(|r| matches!(r, Err(MarketError::Conflict(_)))).count();
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 1);

        // Exactly one ACCEPTED request and a consistent assignment
        let requests = f.store.list_requests_for_project(&project.id).await.unwrap();
        let accepted: Vec<_> = requests.iter().filter(|r| r.status == RequestStatus::Accepted).collect();
        assert_eq!(accepted.len(), 1);

        let assigned = f.store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(assigned.status, ProjectStatus::Assigned);
        assert_eq!(assigned.assigned_solver_id.as_deref(), Some(accepted[0].solver_id.as_str()));
    }

    #[tokio::test]
    async fn role_scoped_listing() {
        let f = fixture().await;
        let buyer = Actor::buyer("buyer-1");
        let solver = Actor::solver("solver-1");
        let project = open_project(&f, &buyer).await;
        f.requests.request_work(&solver, request_input(&project.id)).await.unwrap();

        let own = f.requests.list_requests(&solver, Page::default()).await.unwrap();
        assert_eq!(own.meta.total, 1);

        let incoming = f.requests.list_requests(&buyer, Page::default()).await.unwrap();
        assert_eq!(incoming.meta.total, 1);

        let unrelated = f.requests.list_requests(&Actor::solver("solver-9"), Page::default()).await.unwrap();
        assert_eq!(unrelated.meta.total, 0);

        // Project-scoped listing is owner-only
        assert!(f.requests.list_requests_for_project(&solver, &project.id).await.is_err());
        assert_eq!(f.requests.list_requests_for_project(&buyer, &project.id).await.unwrap().len(), 1);
    }
}
