//! Mock notifier for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::Trade;

use super::{NotifyError, TradeNotifier};

/// Records delivered trades and replays scripted outcomes in order. Once the
/// script is exhausted every delivery succeeds.
#[derive(Debug, Default)]
pub struct MockNotifier {
    delivered: Mutex<Vec<Trade>>,
    script: Mutex<VecDeque<Result<(), NotifyError>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_outcome(&self, outcome: Result<(), NotifyError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn delivered(&self) -> Vec<Trade> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl TradeNotifier for MockNotifier {
    async fn notify(&self, trade: &Trade) -> Result<(), NotifyError> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            self.delivered.lock().unwrap().push(trade.clone());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Signature, TimeMs, TokenAddress, TradeEvent, TradeStatus, WalletAddress};

    fn trade() -> Trade {
        Trade {
            signature: Signature::new("sig".to_string()),
            wallet_address: WalletAddress::new("wallet".to_string()),
            trade_event: TradeEvent::Buy,
            token_address: TokenAddress::new("mint".to_string()),
            token_symbol: "TKN".to_string(),
            quantity: 1.0,
            quantity_usd: 100.0,
            token_amount: 10.0,
            wallet_balance: None,
            status: TradeStatus::Completed,
            time_ms: TimeMs::new(0),
            profit: None,
            profit_usd: None,
            cost_basis: None,
            remaining_balance: None,
            entry_price: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_outcomes_replay_in_order() {
        let notifier = MockNotifier::new();
        notifier.script_outcome(Err(NotifyError::DuplicateContent));
        notifier.script_outcome(Ok(()));

        assert!(matches!(
            notifier.notify(&trade()).await,
            Err(NotifyError::DuplicateContent)
        ));
        assert!(notifier.notify(&trade()).await.is_ok());
        // Exhausted script defaults to success.
        assert!(notifier.notify(&trade()).await.is_ok());
        assert_eq!(notifier.delivered_count(), 2);
    }
}
