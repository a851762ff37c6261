//! Webhook notifier.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::Trade;

use super::{NotifyError, TradeNotifier};

/// Posts each trade as JSON to a configured webhook.
///
/// HTTP 409, or any rejection body mentioning duplicate content, maps to
/// `NotifyError::DuplicateContent`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl TradeNotifier for WebhookNotifier {
    async fn notify(&self, trade: &Trade) -> Result<(), NotifyError> {
        debug!(signature = %trade.signature, "posting trade notification");
        let response = self
            .client
            .post(&self.url)
            .json(trade)
            .send()
            .await
            .map_err(|e| NotifyError::Other(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.as_u16() == 409 {
            return Err(NotifyError::DuplicateContent);
        }

        let body = response.text().await.unwrap_or_default();
        if body.to_ascii_lowercase().contains("duplicate") {
            return Err(NotifyError::DuplicateContent);
        }

        Err(NotifyError::Other(format!(
            "webhook returned {}: {}",
            status, body
        )))
    }
}
