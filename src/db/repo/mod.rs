//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `trades.rs` - Trade record operations
//! - `positions.rs` - Position accumulator operations
//!
//! Position updates are expressed as SQL increments inside a transaction so
//! that two jobs touching the same (wallet, token) pair never clobber each
//! other through a stale in-memory copy.

mod positions;
mod trades;

use sqlx::sqlite::SqlitePool;

use crate::domain::{Signature, TimeMs, Trade};
use crate::ledger::PositionDelta;

/// Record of one applied position delta, kept so compensation can reverse
/// exactly what was written.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaReceipt {
    pub delta: PositionDelta,
    /// True when this application created the position row.
    pub created_position: bool,
    /// True when this application populated the initial_* fields.
    pub set_initial: bool,
}

/// Everything one committed signature wrote, for conditional rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub signature: Signature,
    pub receipts: Vec<DeltaReceipt>,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Commit the trades and position deltas for one signature atomically.
    ///
    /// Trade inserts use ON CONFLICT DO NOTHING on (signature, trade_event);
    /// a conflicting insert applies no delta for that trade, so redelivered
    /// signatures degrade to no-ops.
    ///
    /// # Errors
    /// Returns an error if any statement fails; the transaction rolls back.
    pub async fn commit_trades_atomic(
        &self,
        signature: &Signature,
        entries: &[(Trade, PositionDelta)],
        now: TimeMs,
    ) -> Result<CommitReceipt, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut receipts = Vec::with_capacity(entries.len());

        for (trade, delta) in entries {
            let inserted = trades::insert_trade_tx(&mut tx, trade).await?;
            if !inserted {
                continue;
            }
            let receipt = positions::apply_delta_tx(&mut tx, delta, now).await?;
            receipts.push(receipt);
        }

        tx.commit().await?;
        Ok(CommitReceipt {
            signature: signature.clone(),
            receipts,
        })
    }

    /// Reverse a prior commit: delete the trades for the signature and apply
    /// each delta negated. Positions created by the commit are deleted;
    /// initial_* fields set by it are cleared.
    ///
    /// # Errors
    /// Returns an error if any statement fails; the transaction rolls back.
    pub async fn revert_commit(
        &self,
        receipt: &CommitReceipt,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        trades::delete_trades_by_signature_tx(&mut tx, &receipt.signature).await?;

        for delta_receipt in &receipt.receipts {
            positions::revert_delta_tx(&mut tx, delta_receipt, now).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(super) mod tests_support {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{TokenAddress, TradeEvent, TradeStatus, WalletAddress};
    use tempfile::TempDir;

    pub(in crate::db::repo) async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    pub(in crate::db::repo) fn wallet() -> WalletAddress {
        WalletAddress::new("wallet1".to_string())
    }

    pub(in crate::db::repo) fn token() -> TokenAddress {
        TokenAddress::new("mint1".to_string())
    }

    pub(in crate::db::repo) fn sample_trade(sig: &str) -> Trade {
        Trade {
            signature: Signature::new(sig.to_string()),
            wallet_address: wallet(),
            trade_event: TradeEvent::Buy,
            token_address: token(),
            token_symbol: "TKN".to_string(),
            quantity: 0.25,
            quantity_usd: 50.0,
            token_amount: 100.0,
            wallet_balance: Some(3.0),
            status: TradeStatus::Completed,
            time_ms: TimeMs::new(1000),
            profit: None,
            profit_usd: None,
            cost_basis: None,
            remaining_balance: None,
            entry_price: None,
        }
    }

    pub(in crate::db::repo) fn buy_delta(amount: f64, usd: f64) -> PositionDelta {
        PositionDelta {
            wallet_address: wallet(),
            token_address: token(),
            d_tokens_bought: amount,
            d_cost_basis: usd,
            d_tokens_sold: 0.0,
            set_initial: None,
        }
    }

    pub(in crate::db::repo) fn sell_delta(amount: f64) -> PositionDelta {
        PositionDelta {
            wallet_address: wallet(),
            token_address: token(),
            d_tokens_bought: 0.0,
            d_cost_basis: 0.0,
            d_tokens_sold: amount,
            set_initial: None,
        }
    }
}
