//! Position accumulator operations.
//!
//! SET expressions in SQLite evaluate against the pre-update row, so the
//! increment pass and the derived-field recompute pass are two statements
//! inside the enclosing transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::domain::{Position, TimeMs, TokenAddress, WalletAddress};
use crate::ledger::PositionDelta;

use super::{DeltaReceipt, Repository};

fn row_to_position(row: &SqliteRow) -> Position {
    Position {
        wallet_address: WalletAddress::new(row.get("wallet_address")),
        token_address: TokenAddress::new(row.get("token_address")),
        total_tokens_bought: row.get("total_tokens_bought"),
        total_cost_basis: row.get("total_cost_basis"),
        avg_entry_price: row.get("avg_entry_price"),
        total_tokens_sold: row.get("total_tokens_sold"),
        remaining_balance: row.get("remaining_balance"),
        initial_balance: row.get("initial_balance"),
        initial_cost_basis: row.get("initial_cost_basis"),
        created_at: TimeMs::new(row.get("created_at")),
        last_updated: TimeMs::new(row.get("last_updated")),
    }
}

/// Apply a delta inside an open transaction, creating the position row if
/// needed. Returns a receipt recording what this application changed.
pub(super) async fn apply_delta_tx(
    tx: &mut Transaction<'_, Sqlite>,
    delta: &PositionDelta,
    now: TimeMs,
) -> Result<DeltaReceipt, sqlx::Error> {
    let existing = sqlx::query(
        "SELECT initial_balance FROM positions WHERE wallet_address = ? AND token_address = ?",
    )
    .bind(delta.wallet_address.as_str())
    .bind(delta.token_address.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    let created_position = existing.is_none();
    let had_initial = existing
        .as_ref()
        .map(|row| row.get::<Option<f64>, _>("initial_balance").is_some())
        .unwrap_or(false);
    let set_initial = delta.set_initial.is_some() && !had_initial;

    if created_position {
        sqlx::query(
            r#"
            INSERT INTO positions (wallet_address, token_address, created_at, last_updated)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(delta.wallet_address.as_str())
        .bind(delta.token_address.as_str())
        .bind(now.as_i64())
        .bind(now.as_i64())
        .execute(&mut **tx)
        .await?;
    }

    let (init_balance, init_cost) = match delta.set_initial {
        Some((b, c)) => (Some(b), Some(c)),
        None => (None, None),
    };

    sqlx::query(
        r#"
        UPDATE positions SET
            total_tokens_bought = total_tokens_bought + ?,
            total_cost_basis = total_cost_basis + ?,
            total_tokens_sold = total_tokens_sold + ?,
            initial_balance = COALESCE(initial_balance, ?),
            initial_cost_basis = COALESCE(initial_cost_basis, ?),
            last_updated = ?
        WHERE wallet_address = ? AND token_address = ?
        "#,
    )
    .bind(delta.d_tokens_bought)
    .bind(delta.d_cost_basis)
    .bind(delta.d_tokens_sold)
    .bind(init_balance)
    .bind(init_cost)
    .bind(now.as_i64())
    .bind(delta.wallet_address.as_str())
    .bind(delta.token_address.as_str())
    .execute(&mut **tx)
    .await?;

    recompute_derived_tx(tx, &delta.wallet_address, &delta.token_address).await?;

    Ok(DeltaReceipt {
        delta: delta.clone(),
        created_position,
        set_initial,
    })
}

/// Reverse a previously applied delta inside an open transaction.
pub(super) async fn revert_delta_tx(
    tx: &mut Transaction<'_, Sqlite>,
    receipt: &DeltaReceipt,
    now: TimeMs,
) -> Result<(), sqlx::Error> {
    let delta = &receipt.delta;

    if receipt.created_position {
        sqlx::query("DELETE FROM positions WHERE wallet_address = ? AND token_address = ?")
            .bind(delta.wallet_address.as_str())
            .bind(delta.token_address.as_str())
            .execute(&mut **tx)
            .await?;
        return Ok(());
    }

    if receipt.set_initial {
        sqlx::query(
            r#"
            UPDATE positions SET initial_balance = NULL, initial_cost_basis = NULL
            WHERE wallet_address = ? AND token_address = ?
            "#,
        )
        .bind(delta.wallet_address.as_str())
        .bind(delta.token_address.as_str())
        .execute(&mut **tx)
        .await?;
    }

    let negated = delta.negated();
    sqlx::query(
        r#"
        UPDATE positions SET
            total_tokens_bought = total_tokens_bought + ?,
            total_cost_basis = total_cost_basis + ?,
            total_tokens_sold = total_tokens_sold + ?,
            last_updated = ?
        WHERE wallet_address = ? AND token_address = ?
        "#,
    )
    .bind(negated.d_tokens_bought)
    .bind(negated.d_cost_basis)
    .bind(negated.d_tokens_sold)
    .bind(now.as_i64())
    .bind(delta.wallet_address.as_str())
    .bind(delta.token_address.as_str())
    .execute(&mut **tx)
    .await?;

    recompute_derived_tx(tx, &delta.wallet_address, &delta.token_address).await
}

async fn recompute_derived_tx(
    tx: &mut Transaction<'_, Sqlite>,
    wallet: &WalletAddress,
    token: &TokenAddress,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE positions SET
            avg_entry_price = CASE
                WHEN total_tokens_bought > 0 THEN total_cost_basis / total_tokens_bought
                ELSE 0
            END,
            remaining_balance = CASE
                WHEN total_tokens_bought > 0 THEN total_tokens_bought - total_tokens_sold
                ELSE MAX(COALESCE(initial_balance, 0) - total_tokens_sold, 0)
            END
        WHERE wallet_address = ? AND token_address = ?
        "#,
    )
    .bind(wallet.as_str())
    .bind(token.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl Repository {
    /// Fetch the position for one (wallet, token) pair.
    pub async fn get_position(
        &self,
        wallet: &WalletAddress,
        token: &TokenAddress,
    ) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT * FROM positions WHERE wallet_address = ? AND token_address = ?",
        )
        .bind(wallet.as_str())
        .bind(token.as_str())
        .fetch_optional(self.pool())
        .await?;
        Ok(row.as_ref().map(row_to_position))
    }

    /// List all positions for a wallet, most recently updated first.
    pub async fn list_positions(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Vec<Position>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM positions WHERE wallet_address = ? ORDER BY last_updated DESC, id DESC",
        )
        .bind(wallet.as_str())
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(row_to_position).collect())
    }
}
