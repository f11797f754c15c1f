//! Dependency injection container for the workflow core
//!
//! Wires adapters, the broadcast hub and the services together once at
//! startup. The hub lives as long as the container; `shutdown` stops it,
//! closing every open subscriber session.

use std::sync::Arc;

use crate::{
    adapter::{
        blob::InMemoryBlobStore,
        ledger::LedgerFactory,
        notifier::TracingNotifier,
        store::InMemoryStore
    },
    broadcast::EventBroadcaster,
    config::Settings,
    domain::error::MarketError,
    port::{blob::BlobStore, ledger::Ledger, notifier::Notifier, store::EntityStore},
    service::{ActivityService, ProjectService, TaskService, WorkRequestService}
};

/// Application container that holds all dependencies
pub struct Container {
    pub settings:    Settings,
    pub store:       Arc<dyn EntityStore>,
    pub ledger:      Arc<dyn Ledger>,
    pub broadcaster: EventBroadcaster,
    project_service: Arc<ProjectService>,
    request_service: Arc<WorkRequestService>,
    task_service:    Arc<TaskService>,
    activity_service: Arc<ActivityService>
}

impl Container {
    /// Create a new container with all dependencies wired up
    pub async fn new(settings: Settings) -> Result<Self, MarketError> {
        let store = Arc::new(InMemoryStore::new(settings.lock_timeout())) as Arc<dyn EntityStore>;
        let ledger = LedgerFactory::create(settings.ledger_backend, settings.ledger_path.as_deref())?;
        let notifier = Arc::new(TracingNotifier::new()) as Arc<dyn Notifier>;
        let blobs = Arc::new(InMemoryBlobStore::new()) as Arc<dyn BlobStore>;

        let broadcaster = EventBroadcaster::spawn(settings.feed_buffer).await?;

        let project_service = Arc::new(ProjectService::new(
            store.clone(),
            ledger.clone(),
            broadcaster.clone(),
            settings.page_limit
        ));
        let request_service = Arc::new(WorkRequestService::new(
            store.clone(),
            ledger.clone(),
            broadcaster.clone(),
            notifier.clone(),
            settings.page_limit
        ));
        let task_service = Arc::new(TaskService::new(
            store.clone(),
            ledger.clone(),
            broadcaster.clone(),
            notifier.clone(),
            blobs.clone(),
            settings.page_limit
        ));
        let activity_service = Arc::new(ActivityService::new(store.clone(), ledger.clone(), settings.page_limit));

        Ok(Self {
            settings,
            store,
            ledger,
            broadcaster,
            project_service,
            request_service,
            task_service,
            activity_service
        })
    }

    /// Container with default settings and in-memory adapters
    pub async fn in_memory() -> Result<Self, MarketError> {
        Self::new(Settings::default()).await
    }

    /// Get the project service
    pub fn projects(&self) -> Arc<ProjectService> {
        self.project_service.clone()
    }

    /// Get the work request service
    pub fn requests(&self) -> Arc<WorkRequestService> {
        self.request_service.clone()
    }

    /// Get the task service
    pub fn tasks(&self) -> Arc<TaskService> {
        self.task_service.clone()
    }

    /// Get the activity service
    pub fn activity(&self) -> Arc<ActivityService> {
        self.activity_service.clone()
    }

    /// Stop the broadcast hub, closing all live sessions
    pub fn shutdown(&self) {
        self.broadcaster.stop();
    }
}
