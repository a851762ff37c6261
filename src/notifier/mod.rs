//! Outbound trade notification.
//!
//! After a trade commits, the pipeline hands it to a notifier. A
//! duplicate-content rejection is the one outcome with ledger consequences:
//! it triggers compensation. Everything else is logged and forgotten.

use async_trait::async_trait;
use std::fmt;

use crate::domain::Trade;

pub mod mock;
pub mod webhook;

pub use mock::MockNotifier;
pub use webhook::WebhookNotifier;

#[async_trait]
pub trait TradeNotifier: Send + Sync + fmt::Debug {
    async fn notify(&self, trade: &Trade) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum NotifyError {
    /// The receiver already has this content. Triggers compensation.
    DuplicateContent,
    /// Any other delivery failure. Logged, never rolled back.
    Other(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::DuplicateContent => write!(f, "duplicate content rejected"),
            NotifyError::Other(msg) => write!(f, "notification failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// No-op notifier used when no webhook is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl TradeNotifier for NullNotifier {
    async fn notify(&self, _trade: &Trade) -> Result<(), NotifyError> {
        Ok(())
    }
}
