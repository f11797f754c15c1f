use async_trait::async_trait;

use crate::domain::{activity::ActivityEntry, error::MarketError};

/// Append-only activity ledger port
///
/// Entries are immutable once appended and keep commit order within a
/// project. The ledger is advisory audit history; entity state stays
/// authoritative when an append fails.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &ActivityEntry) -> Result<(), MarketError>;

    /// All entries for a project in append order (oldest first)
    async fn list_for_project(&self, project_id: &str) -> Result<Vec<ActivityEntry>, MarketError>;

    /// Every entry across all projects, unordered between projects
    async fn list_all(&self) -> Result<Vec<ActivityEntry>, MarketError>;
}
