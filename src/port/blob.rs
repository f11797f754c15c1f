use async_trait::async_trait;

use crate::domain::error::MarketError;

/// Binary artifact storage port
///
/// Given raw bytes, produces the durable reference string recorded on a
/// submission. The core never inspects content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning a durable reference
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, MarketError>;

    /// Fetch previously stored bytes by reference
    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, MarketError>;
}
