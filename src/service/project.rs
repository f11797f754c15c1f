//! Project service - posting and owner-side management of projects

use std::sync::Arc;

use chrono::Utc;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    broadcast::EventBroadcaster,
    domain::{
        activity::{ActivityAction, ActivityEntry},
        constant::workflow,
        entity::{Project, ProjectStatus},
        error::MarketError,
        identity::Actor,
        input::{CreateProjectInput, Page, PageMeta, Paged, UpdateProjectInput},
        policy::{self, Capability, ProjectAccess, Snapshot}
    },
    port::{ledger::Ledger, store::{EntityStore, WriteBatch}},
    service::record_and_publish
};

/// Service owning project creation and owner-side management
pub struct ProjectService {
    store:       Arc<dyn EntityStore>,
    ledger:      Arc<dyn Ledger>,
    broadcaster: EventBroadcaster,
    page_limit:  usize
}

impl ProjectService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        ledger: Arc<dyn Ledger>,
        broadcaster: EventBroadcaster,
        page_limit: usize
    ) -> Self {
        Self { store, ledger, broadcaster, page_limit }
    }

    /// Post a new project; any buyer may do this
    pub async fn create_project(&self, actor: &Actor, input: CreateProjectInput) -> Result<Project, MarketError> {
        input.validate()?;
        policy::authorize(actor, Capability::CreateProject, Snapshot::none())?;

        let project = Project {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            skills_required: input.skills_required,
            budget: input.budget,
            deadline: input.deadline,
            buyer_id: actor.id.clone(),
            assigned_solver_id: None,
            status: ProjectStatus::Open,
            created_at: Utc::now()
        };

        let lease = self.store.lock_project(&project.id).await?;
        self.store.apply(WriteBatch::new().put_project(project.clone())).await?;

        let entry = ActivityEntry::new(
            ActivityAction::ProjectCreated,
            &actor.id,
            &project.id,
            format!("Project {} created", project.title)
        );
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        event!(Level::DEBUG, event = workflow::PROJECT_CREATED, project_id = %project.id, buyer_id = %actor.id);
        Ok(project)
    }

    /// Update project fields; core fields are frozen once the project leaves
    /// OPEN
    pub async fn update_project(
        &self,
        actor: &Actor,
        project_id: &str,
        input: UpdateProjectInput
    ) -> Result<Project, MarketError> {
        input.validate()?;

        let lease = self.store.lock_project(project_id).await?;
        let mut project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ManageProject, Snapshot::project(&project))?;

        if project.status != ProjectStatus::Open && input.touches_core_fields() {
            return Err(MarketError::Conflict(
                "Cannot update core fields (title, skills, budget) when project is not OPEN".to_string()
            ));
        }

        if let Some(title) = input.title {
            project.title = title;
        }
        if let Some(description) = input.description {
            project.description = description;
        }
        if let Some(skills) = input.skills_required {
            project.skills_required = skills;
        }
        if let Some(budget) = input.budget {
            project.budget = Some(budget);
        }
        if let Some(deadline) = input.deadline {
            project.deadline = Some(deadline);
        }

        self.store.apply(WriteBatch::new().put_project(project.clone())).await?;
        drop(lease);

        event!(Level::DEBUG, event = workflow::PROJECT_UPDATED, project_id = %project.id);
        Ok(project)
    }

    /// Cancel an OPEN project; the only path into CANCELLED
    pub async fn cancel_project(&self, actor: &Actor, project_id: &str) -> Result<Project, MarketError> {
        let lease = self.store.lock_project(project_id).await?;
        let mut project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ManageProject, Snapshot::project(&project))?;

        if project.status != ProjectStatus::Open {
            return Err(MarketError::Conflict(format!(
                "Cannot cancel project in status {}",
                project.status
            )));
        }

        project.status = ProjectStatus::Cancelled;
        self.store.apply(WriteBatch::new().put_project(project.clone())).await?;

        let entry = ActivityEntry::new(
            ActivityAction::ProjectCancelled,
            &actor.id,
            &project.id,
            format!("Project {} cancelled", project.title)
        );
        record_and_publish(&self.ledger, &self.broadcaster, entry, &ProjectAccess::of(&project)).await;
        drop(lease);

        event!(Level::DEBUG, event = workflow::PROJECT_CANCELLED, project_id = %project.id);
        Ok(project)
    }

    /// Fetch a project by id
    pub async fn get_project(&self, project_id: &str) -> Result<Project, MarketError> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))
    }

    /// All projects, newest first; unrestricted read
    pub async fn list_projects(&self, page: Page) -> Result<Paged<Project>, MarketError> {
        let projects = self.store.list_projects().await?;
        let total = projects.len();
        let (skip, limit) = page.normalized(self.page_limit);

        Ok(Paged {
            meta: PageMeta { page: page.page.max(1), limit, total },
            data: projects.into_iter().skip(skip).take(limit).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        adapter::{ledger::InMemoryLedger, store::InMemoryStore},
        domain::input::CreateProjectInput
    };

    async fn service() -> ProjectService {
        let store: Arc<dyn EntityStore> = Arc::new(InMemoryStore::new(Duration::from_millis(200)));
        let ledger: Arc<dyn Ledger> = Arc::new(InMemoryLedger::new());
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();
        ProjectService::new(store, ledger, broadcaster, 100)
    }

    fn valid_input() -> CreateProjectInput {
        CreateProjectInput {
            title: "Marketplace dashboard".to_string(),
            description: "Build the seller-facing dashboard with live order updates".to_string(),
            skills_required: vec!["rust".to_string(), "design".to_string()],
            budget: Some(2500),
            deadline: None
        }
    }

    #[tokio::test]
    async fn buyer_creates_an_open_project() {
        let svc = service().await;
        let buyer = Actor::buyer("buyer-1");

        let project = svc.create_project(&buyer, valid_input()).await.unwrap();
        assert_eq!(project.status, ProjectStatus::Open);
        assert_eq!(project.buyer_id, "buyer-1");
        assert!(project.assigned_solver_id.is_none());
        assert!(project.assignment_consistent());

        let fetched = svc.get_project(&project.id).await.unwrap();
        assert_eq!(fetched.id, project.id);
    }

    #[tokio::test]
    async fn solver_cannot_create_a_project() {
        let svc = service().await;
        let err = svc.create_project(&Actor::solver("solver-1"), valid_input()).await.unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancel_is_owner_only_and_open_only() {
        let svc = service().await;
        let buyer = Actor::buyer("buyer-1");
        let project = svc.create_project(&buyer, valid_input()).await.unwrap();

        let err = svc.cancel_project(&Actor::buyer("buyer-2"), &project.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));

        let cancelled = svc.cancel_project(&buyer, &project.id).await.unwrap();
        assert_eq!(cancelled.status, ProjectStatus::Cancelled);

        let err = svc.cancel_project(&buyer, &project.id).await.unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_freezes_core_fields_outside_open() {
        let svc = service().await;
        let buyer = Actor::buyer("buyer-1");
        let project = svc.create_project(&buyer, valid_input()).await.unwrap();

        // Simulate assignment so the project is no longer OPEN
        let mut assigned = project.clone();
        assigned.status = ProjectStatus::Assigned;
        assigned.assigned_solver_id = Some("solver-1".to_string());
        svc.store.apply(WriteBatch::new().put_project(assigned)).await.unwrap();

        let err = svc
            .update_project(
                &buyer,
                &project.id,
                UpdateProjectInput { budget: Some(9000), ..Default::default() }
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));

        // Non-core fields stay editable
        let updated = svc
            .update_project(
                &buyer,
                &project.id,
                UpdateProjectInput {
                    description: Some("Revised description with enough detail to validate".to_string()),
                    ..Default::default()
                }
            )
            .await
            .unwrap();
        assert!(updated.description.starts_with("Revised"));
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let svc = service().await;
        let err = svc.cancel_project(&Actor::buyer("buyer-1"), "missing").await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }
}
