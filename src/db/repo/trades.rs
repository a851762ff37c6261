//! Trade record operations.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::domain::{
    Signature, TimeMs, TokenAddress, Trade, TradeEvent, TradeStatus, WalletAddress,
};

use super::Repository;

pub(super) async fn insert_trade_tx(
    tx: &mut Transaction<'_, Sqlite>,
    trade: &Trade,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO trades (
            signature, wallet_address, trade_event, token_address, token_symbol,
            quantity, quantity_usd, token_amount, wallet_balance, status, time_ms,
            profit, profit_usd, cost_basis, remaining_balance, entry_price
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(signature, trade_event) DO NOTHING
        "#,
    )
    .bind(trade.signature.as_str())
    .bind(trade.wallet_address.as_str())
    .bind(trade.trade_event.as_str())
    .bind(trade.token_address.as_str())
    .bind(&trade.token_symbol)
    .bind(trade.quantity)
    .bind(trade.quantity_usd)
    .bind(trade.token_amount)
    .bind(trade.wallet_balance)
    .bind(trade.status.as_str())
    .bind(trade.time_ms.as_i64())
    .bind(trade.profit)
    .bind(trade.profit_usd)
    .bind(trade.cost_basis)
    .bind(trade.remaining_balance)
    .bind(trade.entry_price)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn delete_trades_by_signature_tx(
    tx: &mut Transaction<'_, Sqlite>,
    signature: &Signature,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM trades WHERE signature = ?")
        .bind(signature.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

fn row_to_trade(row: &SqliteRow) -> Trade {
    let event_str: String = row.get("trade_event");
    Trade {
        signature: Signature::new(row.get("signature")),
        wallet_address: WalletAddress::new(row.get("wallet_address")),
        trade_event: TradeEvent::parse(&event_str).unwrap_or(TradeEvent::Buy),
        token_address: TokenAddress::new(row.get("token_address")),
        token_symbol: row.get("token_symbol"),
        quantity: row.get("quantity"),
        quantity_usd: row.get("quantity_usd"),
        token_amount: row.get("token_amount"),
        wallet_balance: row.get("wallet_balance"),
        status: TradeStatus::Completed,
        time_ms: TimeMs::new(row.get("time_ms")),
        profit: row.get("profit"),
        profit_usd: row.get("profit_usd"),
        cost_basis: row.get("cost_basis"),
        remaining_balance: row.get("remaining_balance"),
        entry_price: row.get("entry_price"),
    }
}

impl Repository {
    /// Existence of any trade row for a signature is conclusive proof the
    /// pipeline already committed that transaction.
    pub async fn trade_exists(&self, signature: &Signature) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM trades WHERE signature = ? LIMIT 1")
            .bind(signature.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Query trades for a wallet, newest first, 1-based page.
    ///
    /// Returns the page of trades and the total count for the wallet.
    pub async fn query_trades(
        &self,
        wallet: &WalletAddress,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Trade>, i64), sqlx::Error> {
        let page = page.max(1);
        let offset = (page as i64 - 1) * limit as i64;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trades WHERE wallet_address = ?")
                .bind(wallet.as_str())
                .fetch_one(self.pool())
                .await?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM trades
            WHERE wallet_address = ?
            ORDER BY time_ms DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(wallet.as_str())
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok((rows.iter().map(row_to_trade).collect(), total.0))
    }

    /// Fetch all trade rows recorded for one signature.
    pub async fn get_trades_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<Trade>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM trades WHERE signature = ? ORDER BY id ASC")
            .bind(signature.as_str())
            .fetch_all(self.pool())
            .await?;
        Ok(rows.iter().map(row_to_trade).collect())
    }
}
