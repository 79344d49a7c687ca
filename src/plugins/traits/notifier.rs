use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{format_price, NotificationKind};
use crate::utils::error::Result;

/// Values a notification template is rendered with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationContext {
    pub name: String,
    pub url: String,
    pub price: Option<f64>,
}

impl NotificationContext {
    pub fn formatted_price(&self) -> String {
        format_price(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub recipients: usize,
}

impl NotificationResult {
    /// Result of a dispatch with nobody to send to.
    pub fn skipped() -> Self {
        Self {
            success: true,
            message_id: None,
            recipients: 0,
        }
    }
}

/// Trait for notification transports (email, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Sends one templated message. An empty recipient list is a no-op.
    async fn dispatch(
        &self,
        kind: NotificationKind,
        context: &NotificationContext,
        recipients: &[String],
    ) -> Result<NotificationResult>;
}
