//! Notification sink adapters
//!
//! `TracingNotifier` records deliveries in the log stream; real deployments
//! put an email or push gateway behind the same port. Workflow services call
//! the sink strictly after commit and swallow its failures.

use async_trait::async_trait;
use tracing::{Level, event};

use crate::{
    domain::{constant::notifier, error::MarketError},
    port::notifier::Notifier
};

/// Notifier that logs deliveries instead of sending them
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, recipient_id: &str, subject: &str, body: &str) -> Result<(), MarketError> {
        event!(Level::INFO, event = notifier::NOTIFICATION_SENT,
               recipient = %recipient_id, subject = %subject, body = %body);
        Ok(())
    }
}
