use thiserror::Error;

/// Common error types for the marketplace workflow core
#[derive(Error, Debug, Clone)]
pub enum MarketError {
    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Capability denied by the access policy
    #[error("{0}")]
    Forbidden(String),

    /// Entity is not in the required state for the requested transition,
    /// or a uniqueness rule was violated
    #[error("{0}")]
    Conflict(String),

    /// Malformed or incomplete input
    #[error("{0}")]
    Validation(String),

    /// Project-scoped lock was not acquired within the bounded window;
    /// callers may retry
    #[error("{0}")]
    LockTimeout(String),

    /// Entity storage errors
    #[error("{0}")]
    Storage(String),

    /// Activity ledger errors
    #[error("{0}")]
    Ledger(String),

    /// Serialization/deserialization errors
    #[error("{0}")]
    Serialization(String),

    /// Actor spawn errors
    #[error("{0}")]
    Spawn(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String)
}

impl MarketError {
    /// Whether a retry of the same operation can be expected to succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketError::LockTimeout(_))
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for MarketError {
    fn from(err: anyhow::Error) -> Self {
        MarketError::Generic(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Serialization(err.to_string())
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for MarketError {
    fn from(err: ractor::SpawnErr) -> Self {
        MarketError::Spawn(err.to_string())
    }
}
