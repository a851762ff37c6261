//! Running position per (wallet, token), owned exclusively by the ledger.

use serde::{Deserialize, Serialize};

use super::{TimeMs, TokenAddress, WalletAddress};

/// Average-cost-basis position for one (wallet, token) pair.
///
/// Invariant: once buy history exists, `remaining_balance` equals
/// `total_tokens_bought - total_tokens_sold`; otherwise it equals
/// `max(0, initial_balance - total_tokens_sold)`. `avg_entry_price` is never
/// applied on the untracked branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub wallet_address: WalletAddress,
    pub token_address: TokenAddress,

    pub total_tokens_bought: f64,
    /// Quote-currency (USD) value of all tracked buys.
    pub total_cost_basis: f64,
    /// total_cost_basis / total_tokens_bought, 0 while no buys exist.
    pub avg_entry_price: f64,
    pub total_tokens_sold: f64,
    pub remaining_balance: f64,

    /// Populated once, when a sell is observed for a token with no buy
    /// history, from the wallet's on-chain balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_cost_basis: Option<f64>,

    pub created_at: TimeMs,
    pub last_updated: TimeMs,
}

impl Position {
    /// A zeroed position for a pair that has just been observed.
    pub fn empty(wallet: WalletAddress, token: TokenAddress, now: TimeMs) -> Self {
        Self {
            wallet_address: wallet,
            token_address: token,
            total_tokens_bought: 0.0,
            total_cost_basis: 0.0,
            avg_entry_price: 0.0,
            total_tokens_sold: 0.0,
            remaining_balance: 0.0,
            initial_balance: None,
            initial_cost_basis: None,
            created_at: now,
            last_updated: now,
        }
    }

    /// True when at least one buy has been recorded for this pair.
    pub fn has_buy_history(&self) -> bool {
        self.total_tokens_bought > 0.0
    }
}
