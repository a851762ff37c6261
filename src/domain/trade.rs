//! Immutable trade records, one per committed (signature, event) pair.

use serde::{Deserialize, Serialize};

use super::{Signature, TimeMs, TokenAddress, TradeEvent, WalletAddress};

/// Processing status of a trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Completed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Completed => "completed",
        }
    }
}

/// A committed trade. Append-only; deleted only by compensation.
///
/// The sell-only fields are snapshots of the ledger computation at the
/// moment of sale and are never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub signature: Signature,
    pub wallet_address: WalletAddress,
    pub trade_event: TradeEvent,
    pub token_address: TokenAddress,
    pub token_symbol: String,
    /// Quote value of the trade in native-coin units.
    pub quantity: f64,
    /// Quote value of the trade in USD.
    pub quantity_usd: f64,
    /// Raw token amount in UI units.
    pub token_amount: f64,
    /// Wallet's native-coin balance at observation time, if known.
    pub wallet_balance: Option<f64>,
    pub status: TradeStatus,
    pub time_ms: TimeMs,

    // Sell-only snapshot fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
}

impl Trade {
    /// Returns true if every numeric field is finite. Non-finite values are
    /// a hard error for the enclosing job and must never be persisted.
    pub fn is_finite(&self) -> bool {
        let required = [self.quantity, self.quantity_usd, self.token_amount];
        let optional = [
            self.wallet_balance,
            self.profit,
            self.profit_usd,
            self.cost_basis,
            self.remaining_balance,
            self.entry_price,
        ];
        required.iter().all(|v| v.is_finite())
            && optional.iter().flatten().all(|v| v.is_finite())
    }
}
