use async_trait::async_trait;

use crate::domain::error::MarketError;

/// Best-effort human notification sink
///
/// Address resolution belongs to the sink; the core only knows actor ids.
/// Deliveries run strictly after the originating transaction commits and a
/// failure here never surfaces to the workflow caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient_id: &str, subject: &str, body: &str) -> Result<(), MarketError>;
}
