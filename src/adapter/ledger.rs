//! Activity ledger implementations - pluggable persistence
//!
//! The ledger backend is selected by configuration:
//! - InMemoryLedger: for development/testing
//! - RocksDbLedger: durable audit history across restarts
//!
//! Appends for a single project are serialized by the caller's project
//! lease, which is what keeps per-project commit order; the adapters only
//! guarantee that individual appends are durable and reads are consistent.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use rocksdb::{DB, Options};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{Level, event};

use crate::{
    domain::{activity::ActivityEntry, constant::ledger, error::MarketError},
    port::ledger::Ledger
};

/// Ledger backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerBackend {
    #[serde(rename = "inmemory")]
    InMemory,
    #[serde(rename = "rocksdb")]
    RocksDb
}

impl LedgerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerBackend::InMemory => "inmemory",
            LedgerBackend::RocksDb => "rocksdb"
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "inmemory" => Ok(LedgerBackend::InMemory),
            "rocksdb" => Ok(LedgerBackend::RocksDb),
            other => Err(format!("Unknown ledger backend: {}", other))
        }
    }
}

/// In-memory ledger implementation
///
/// Entry vectors keyed by project id; append order is commit order.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<HashMap<String, Vec<ActivityEntry>>>>
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())) }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn append(&self, entry: &ActivityEntry) -> Result<(), MarketError> {
        let mut entries = self.entries.write().await;
        entries.entry(entry.project_id.clone()).or_default().push(entry.clone());

        event!(Level::DEBUG, event = ledger::ENTRY_APPENDED,
               project_id = %entry.project_id, action = %entry.action);
        Ok(())
    }

    async fn list_for_project(&self, project_id: &str) -> Result<Vec<ActivityEntry>, MarketError> {
        let entries = self.entries.read().await;
        Ok(entries.get(project_id).cloned().unwrap_or_default())
    }

    async fn list_all(&self) -> Result<Vec<ActivityEntry>, MarketError> {
        let entries = self.entries.read().await;
        Ok(entries.values().flatten().cloned().collect())
    }
}

/// RocksDB-backed ledger implementation
///
/// Storage layout: `ledger:{project_id}` -> serialized Vec<ActivityEntry>.
/// Uses a shared RocksDB instance to stay within RocksDB's single-process
/// locking model.
pub struct RocksDbLedger {
    db: Arc<DB>
}

impl RocksDbLedger {
    /// Creates a ledger from an existing DB instance
    pub fn from_db(db: Arc<DB>) -> Self {
        Self { db }
    }

    fn key(project_id: &str) -> String {
        format!("ledger:{}", project_id)
    }

    fn read_entries(db: &DB, project_id: &str) -> Result<Vec<ActivityEntry>, MarketError> {
        match db.get(Self::key(project_id).as_bytes()) {
            Ok(Some(data)) => serde_json::from_slice(&data)
                .map_err(|e| MarketError::Serialization(format!("Failed to deserialize ledger entries: {}", e))),
            Ok(None) => Ok(vec![]),
            Err(e) => Err(MarketError::Ledger(format!("Failed to read from RocksDB: {}", e)))
        }
    }
}

#[async_trait]
impl Ledger for RocksDbLedger {
    async fn append(&self, entry: &ActivityEntry) -> Result<(), MarketError> {
        let db = self.db.clone();
        let entry = entry.clone();

        tokio::task::spawn_blocking(move || -> Result<(), MarketError> {
            let mut entries = Self::read_entries(&db, &entry.project_id)?;
            let project_id = entry.project_id.clone();
            entries.push(entry);

            let data = serde_json::to_vec(&entries)
                .map_err(|e| MarketError::Serialization(format!("Failed to serialize ledger entries: {}", e)))?;
            db.put(Self::key(&project_id).as_bytes(), &data)
                .map_err(|e| MarketError::Ledger(format!("Failed to write to RocksDB: {}", e)))
        })
        .await
        .map_err(|e| MarketError::Generic(format!("Failed to append ledger entry: {}", e)))?
    }

    async fn list_for_project(&self, project_id: &str) -> Result<Vec<ActivityEntry>, MarketError> {
        let db = self.db.clone();
        let project_id = project_id.to_string();

        tokio::task::spawn_blocking(move || Self::read_entries(&db, &project_id))
            .await
            .map_err(|e| MarketError::Generic(format!("Failed to read ledger entries: {}", e)))?
    }

    async fn list_all(&self) -> Result<Vec<ActivityEntry>, MarketError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<ActivityEntry>, MarketError> {
            let mut all = Vec::new();
            let prefix = b"ledger:";

            let iter = db.iterator(rocksdb::IteratorMode::From(prefix, rocksdb::Direction::Forward));
            for item in iter {
                let (key, value) =
                    item.map_err(|e| MarketError::Ledger(format!("Failed to iterate RocksDB: {}", e)))?;
                if !key.starts_with(prefix) {
                    break;
                }
                let entries: Vec<ActivityEntry> = serde_json::from_slice(&value)
                    .map_err(|e| MarketError::Serialization(format!("Failed to deserialize ledger entries: {}", e)))?;
                all.extend(entries);
            }

            Ok(all)
        })
        .await
        .map_err(|e| MarketError::Generic(format!("Failed to list ledger entries: {}", e)))?
    }
}

/// Shared RocksDB instance holder
static DB_INSTANCE: once_cell::sync::OnceCell<Arc<DB>> = once_cell::sync::OnceCell::new();

/// Factory for creating ledgers based on configuration
pub struct LedgerFactory;

impl LedgerFactory {
    /// Creates a ledger and initializes the shared DB if needed
    pub fn create(backend: LedgerBackend, db_path: Option<&Path>) -> Result<Arc<dyn Ledger>, MarketError> {
        match backend {
            LedgerBackend::InMemory => Ok(Arc::new(InMemoryLedger::new())),
            LedgerBackend::RocksDb => {
                let path =
                    db_path.ok_or(MarketError::Generic("RocksDB ledger requires a db path".to_string()))?;

                let db = DB_INSTANCE.get_or_try_init(|| {
                    let mut opts = Options::default();
                    opts.create_if_missing(true);
                    opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                    DB::open(&opts, path)
                        .map(Arc::new)
                        .map_err(|e| MarketError::Ledger(format!("Failed to open RocksDB: {}", e)))
                })?;

                Ok(Arc::new(RocksDbLedger::from_db(db.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityAction;

    #[tokio::test]
    async fn inmemory_ledger_preserves_append_order() {
        let ledger = InMemoryLedger::new();

        for i in 0..3 {
            let entry = ActivityEntry::new(
                ActivityAction::TaskCreated,
                "solver-1",
                "p-1",
                format!("Task {} created", i)
            );
            ledger.append(&entry).await.unwrap();
        }

        let entries = ledger.list_for_project("p-1").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "Task 0 created");
        assert_eq!(entries[2].message, "Task 2 created");

        assert!(ledger.list_for_project("p-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rocksdb_ledger_round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = Arc::new(DB::open(&opts, dir.path()).unwrap());
        let ledger = RocksDbLedger::from_db(db);

        let first = ActivityEntry::new(ActivityAction::SolverRequested, "solver-1", "p-1", "Solver requested");
        let second = ActivityEntry::new(ActivityAction::SolverAssigned, "buyer-1", "p-1", "Solver assigned");
        let other = ActivityEntry::new(ActivityAction::ProjectCreated, "buyer-2", "p-2", "Project created");

        ledger.append(&first).await.unwrap();
        ledger.append(&second).await.unwrap();
        ledger.append(&other).await.unwrap();

        let entries = ledger.list_for_project("p-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first.id);
        assert_eq!(entries[1].id, second.id);

        let all = ledger.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
