//! Mock chain client for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::{ChainClient, ChainError};

/// In-memory chain client. Transactions and balances are scripted by tests;
/// `fail_fetches` makes the next N transaction fetches fail transiently.
#[derive(Debug, Default)]
pub struct MockChainClient {
    transactions: Mutex<HashMap<String, Value>>,
    sol_balances: Mutex<HashMap<String, f64>>,
    token_balances: Mutex<HashMap<(String, String), f64>>,
    fail_fetches: AtomicU32,
    fetch_calls: AtomicU32,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_transaction(&self, signature: &str, tx: Value) {
        self.transactions
            .lock()
            .unwrap()
            .insert(signature.to_string(), tx);
    }

    pub fn set_sol_balance(&self, wallet: &str, balance: f64) {
        self.sol_balances
            .lock()
            .unwrap()
            .insert(wallet.to_string(), balance);
    }

    pub fn set_token_balance(&self, wallet: &str, mint: &str, balance: f64) {
        self.token_balances
            .lock()
            .unwrap()
            .insert((wallet.to_string(), mint.to_string()), balance);
    }

    /// Make the next `count` transaction fetches fail with a network error.
    pub fn fail_next_fetches(&self, count: u32) {
        self.fail_fetches.store(count, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn fetch_transaction(&self, signature: &str) -> Result<Option<Value>, ChainError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_fetches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_fetches.store(remaining - 1, Ordering::SeqCst);
            return Err(ChainError::NetworkError("scripted failure".to_string()));
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_sol_balance(&self, wallet: &str) -> Result<f64, ChainError> {
        Ok(self
            .sol_balances
            .lock()
            .unwrap()
            .get(wallet)
            .copied()
            .unwrap_or(0.0))
    }

    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<f64, ChainError> {
        Ok(self
            .token_balances
            .lock()
            .unwrap()
            .get(&(wallet.to_string(), mint.to_string()))
            .copied()
            .unwrap_or(0.0))
    }
}
