//! Activity queries - paged reads over the append-only ledger
//!
//! Read-only consumer of the same ledger the live feed publishes from; the
//! project feed applies the identical VIEW_ACTIVITY gate whether or not the
//! caller is live-subscribed.

use std::{collections::HashSet, sync::Arc};

use crate::{
    domain::{
        activity::ActivityEntry,
        error::MarketError,
        identity::{Actor, Role},
        input::{Page, PageMeta, Paged},
        policy::{self, Capability, Snapshot}
    },
    port::{ledger::Ledger, store::EntityStore}
};

/// Service answering activity queries
pub struct ActivityService {
    store:      Arc<dyn EntityStore>,
    ledger:     Arc<dyn Ledger>,
    page_limit: usize
}

impl ActivityService {
    pub fn new(store: Arc<dyn EntityStore>, ledger: Arc<dyn Ledger>, page_limit: usize) -> Self {
        Self { store, ledger, page_limit }
    }

    /// Ledger entries for a project, newest first, gated by VIEW_ACTIVITY
    pub async fn list_activity(
        &self,
        actor: &Actor,
        project_id: &str,
        page: Page
    ) -> Result<Paged<ActivityEntry>, MarketError> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or(MarketError::NotFound("Project not found".to_string()))?;

        policy::authorize(actor, Capability::ViewActivity, Snapshot::project(&project))?;

        let mut entries = self.ledger.list_for_project(project_id).await?;
        entries.reverse();

        let total = entries.len();
        let (skip, limit) = page.normalized(self.page_limit);

        Ok(Paged {
            meta: PageMeta { page: page.page.max(1), limit, total },
            data: entries.into_iter().skip(skip).take(limit).collect()
        })
    }

    /// Cross-project recent feed scoped by role: buyers see their own actions
    /// and their projects, solvers their own actions and their tasks, admins
    /// everything
    pub async fn recent_activity(&self, actor: &Actor, limit: usize) -> Result<Vec<ActivityEntry>, MarketError> {
        let mut entries = self.ledger.list_all().await?;

        match actor.role {
            Role::Admin => {}
            Role::Buyer => {
                let owned: HashSet<String> = self
                    .store
                    .list_projects()
                    .await?
                    .into_iter()
                    .filter(|p| p.buyer_id == actor.id)
                    .map(|p| p.id)
                    .collect();
                entries.retain(|e| e.actor_id == actor.id || owned.contains(&e.project_id));
            }
            Role::Solver => {
                let mine: HashSet<String> =
                    self.store.list_tasks_for_solver(&actor.id).await?.into_iter().map(|t| t.id).collect();
                entries.retain(|e| {
                    e.actor_id == actor.id || e.task_id.as_ref().is_some_and(|task_id| mine.contains(task_id))
                });
            }
        }

        entries.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        entries.truncate(limit.min(self.page_limit));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        adapter::{ledger::InMemoryLedger, notifier::TracingNotifier, store::InMemoryStore},
        broadcast::EventBroadcaster,
        domain::{
            activity::ActivityAction,
            input::{CreateProjectInput, RequestWorkInput}
        },
        port::notifier::Notifier,
        service::{project::ProjectService, request::WorkRequestService}
    };

    struct Fixture {
        projects: ProjectService,
        requests: WorkRequestService,
        activity: ActivityService
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn EntityStore> = Arc::new(InMemoryStore::new(Duration::from_secs(1)));
        let ledger: Arc<dyn Ledger> = Arc::new(InMemoryLedger::new());
        let broadcaster = EventBroadcaster::spawn(16).await.unwrap();
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new());

        Fixture {
            projects: ProjectService::new(store.clone(), ledger.clone(), broadcaster.clone(), 100),
            requests: WorkRequestService::new(store.clone(), ledger.clone(), broadcaster, notifier, 100),
            activity: ActivityService::new(store, ledger, 100)
        }
    }

    async fn seeded_project(f: &Fixture) -> (Actor, String) {
        let buyer = Actor::buyer("buyer-1");
        let project = f
            .projects
            .create_project(
                &buyer,
                CreateProjectInput {
                    title: "Audited project".to_string(),
                    description: "A project whose history the activity feed exposes".to_string(),
                    skills_required: vec!["rust".to_string()],
                    budget: None,
                    deadline: None
                }
            )
            .await
            .unwrap();

        let request = f
            .requests
            .request_work(
                &Actor::solver("solver-1"),
                RequestWorkInput { project_id: project.id.clone(), proposal: None }
            )
            .await
            .unwrap();
        f.requests.accept_work(&buyer, &request.id).await.unwrap();

        (buyer, project.id)
    }

    #[tokio::test]
    async fn project_feed_is_newest_first_and_gated() {
        let f = fixture().await;
        let (buyer, project_id) = seeded_project(&f).await;

        let page = f.activity.list_activity(&buyer, &project_id, Page::default()).await.unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.data[0].action, ActivityAction::SolverAssigned);
        assert_eq!(page.data[2].action, ActivityAction::ProjectCreated);

        // The assigned solver reads the same feed
        let page = f
            .activity
            .list_activity(&Actor::solver("solver-1"), &project_id, Page::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);

        // An unrelated solver does not
        let err = f
            .activity
            .list_activity(&Actor::solver("solver-9"), &project_id, Page::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));
    }

    #[tokio::test]
    async fn paging_bounds_the_feed() {
        let f = fixture().await;
        let (buyer, project_id) = seeded_project(&f).await;

        let page = f
            .activity
            .list_activity(&buyer, &project_id, Page { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total, 3);

        let page = f
            .activity
            .list_activity(&buyer, &project_id, Page { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].action, ActivityAction::ProjectCreated);
    }

    #[tokio::test]
    async fn recent_feed_is_role_scoped() {
        let f = fixture().await;
        let (_buyer, _project_id) = seeded_project(&f).await;

        // The requesting solver sees at least their own action
        let entries = f.activity.recent_activity(&Actor::solver("solver-1"), 10).await.unwrap();
        assert!(entries.iter().any(|e| e.action == ActivityAction::SolverRequested));

        // An unrelated solver sees nothing
        let entries = f.activity.recent_activity(&Actor::solver("solver-9"), 10).await.unwrap();
        assert!(entries.is_empty());

        // Admin sees the full history
        let entries = f.activity.recent_activity(&Actor::admin("admin-1"), 10).await.unwrap();
        assert_eq!(entries.len(), 3);
    }
}
