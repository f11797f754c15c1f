//! Runtime settings for the workflow core

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapter::ledger::LedgerBackend;

/// Configuration for the marketplace workflow core
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Bounded wait for the per-project write lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Per-session live feed channel capacity
    pub feed_buffer:     usize,
    /// Hard cap on page sizes for list queries
    pub page_limit:      usize,
    /// Activity ledger backend
    pub ledger_backend:  LedgerBackend,
    /// RocksDB path, required when the ledger backend is rocksdb
    pub ledger_path:     Option<PathBuf>
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            feed_buffer:     64,
            page_limit:      100,
            ledger_backend:  LedgerBackend::InMemory,
            ledger_path:     None
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(value) = std::env::var("MARKETFLOW_LOCK_TIMEOUT_MS") {
            settings.lock_timeout_ms =
                value.parse().with_context(|| format!("Invalid MARKETFLOW_LOCK_TIMEOUT_MS: {}", value))?;
        }
        if let Ok(value) = std::env::var("MARKETFLOW_FEED_BUFFER") {
            settings.feed_buffer =
                value.parse().with_context(|| format!("Invalid MARKETFLOW_FEED_BUFFER: {}", value))?;
        }
        if let Ok(value) = std::env::var("MARKETFLOW_PAGE_LIMIT") {
            settings.page_limit =
                value.parse().with_context(|| format!("Invalid MARKETFLOW_PAGE_LIMIT: {}", value))?;
        }
        if let Ok(value) = std::env::var("MARKETFLOW_LEDGER_BACKEND") {
            settings.ledger_backend = LedgerBackend::from_str(&value)
                .map_err(anyhow::Error::msg)
                .context("Invalid MARKETFLOW_LEDGER_BACKEND")?;
        }
        if let Ok(value) = std::env::var("MARKETFLOW_LEDGER_PATH") {
            settings.ledger_path = Some(PathBuf::from(value));
        }

        Ok(settings)
    }

    /// The lock acquisition window as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_in_memory_ledger() {
        let settings = Settings::default();
        assert_eq!(settings.ledger_backend, LedgerBackend::InMemory);
        assert_eq!(settings.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn settings_round_trip_through_serde() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.page_limit, settings.page_limit);
        assert_eq!(parsed.ledger_backend, settings.ledger_backend);
    }
}
