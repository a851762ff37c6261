//! Pure average-cost-basis ledger computations.
//!
//! Every transition here is a pure function from the stored position (if
//! any) plus the observed swap amounts to a [`PositionDelta`] and the PnL
//! snapshot fields for the trade record. The repository applies the delta
//! atomically; the pipeline keeps the delta around so compensation can
//! reverse exactly what was written.

use thiserror::Error;

use crate::domain::{Position, TokenAddress, WalletAddress};

/// The increments a ledger transition wants applied to a position.
///
/// Reversal is `negated()` applied through the same code path, never a
/// snapshot restore, so interleaved writes from other signatures survive
/// compensation.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionDelta {
    pub wallet_address: WalletAddress,
    pub token_address: TokenAddress,
    pub d_tokens_bought: f64,
    pub d_cost_basis: f64,
    pub d_tokens_sold: f64,
    /// One-shot untracked-balance capture: (initial_balance, initial_cost_basis).
    pub set_initial: Option<(f64, f64)>,
}

impl PositionDelta {
    pub fn negated(&self) -> PositionDelta {
        PositionDelta {
            wallet_address: self.wallet_address.clone(),
            token_address: self.token_address.clone(),
            d_tokens_bought: -self.d_tokens_bought,
            d_cost_basis: -self.d_cost_basis,
            d_tokens_sold: -self.d_tokens_sold,
            set_initial: None,
        }
    }
}

/// Outcome of a buy transition.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyOutcome {
    pub delta: PositionDelta,
    pub avg_entry_price_after: f64,
    pub remaining_after: f64,
}

/// Which accounting branch a sell took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellBranch {
    /// Buy history exists; cost basis from the running average.
    Tracked,
    /// No buy history; basis substituted from a discovered on-chain balance.
    UntrackedWithBalance,
    /// No buy history and nothing discoverable; basis forced to zero.
    UntrackedNoBalance,
}

/// Outcome of a sell transition, snapshotting the PnL computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SellOutcome {
    pub delta: PositionDelta,
    pub branch: SellBranch,
    pub cost_basis: f64,
    pub profit_usd: f64,
    /// profit_usd converted at the native-coin price (rate 1 when unknown).
    pub profit_coin: f64,
    pub entry_price: f64,
    pub remaining_after: f64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("non-finite value computed for {0}")]
    NonFinite(&'static str),
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
}

fn ensure_finite(value: f64, field: &'static str) -> Result<f64, LedgerError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LedgerError::NonFinite(field))
    }
}

/// Compute a buy transition.
///
/// `usd_value` is the quote-currency value of the purchase. The position
/// always lands in (or stays in) the tracked state.
pub fn compute_buy(
    position: Option<&Position>,
    wallet: &WalletAddress,
    token: &TokenAddress,
    amount: f64,
    usd_value: f64,
) -> Result<BuyOutcome, LedgerError> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(LedgerError::InvalidAmount(amount));
    }
    ensure_finite(usd_value, "usd_value")?;

    let (bought, cost, sold) = match position {
        Some(p) => (p.total_tokens_bought, p.total_cost_basis, p.total_tokens_sold),
        None => (0.0, 0.0, 0.0),
    };

    let bought_after = bought + amount;
    let cost_after = cost + usd_value;
    let avg_after = if bought_after > 0.0 {
        ensure_finite(cost_after / bought_after, "avg_entry_price")?
    } else {
        0.0
    };
    let remaining_after = ensure_finite(bought_after - sold, "remaining_balance")?;

    Ok(BuyOutcome {
        delta: PositionDelta {
            wallet_address: wallet.clone(),
            token_address: token.clone(),
            d_tokens_bought: amount,
            d_cost_basis: usd_value,
            d_tokens_sold: 0.0,
            set_initial: None,
        },
        avg_entry_price_after: avg_after,
        remaining_after,
    })
}

/// Compute a sell transition.
///
/// `sell_value_usd` is the quote value received for the sale.
/// `coin_price_usd` converts USD profit into native-coin profit; `None`
/// means the lookup failed and the rate defaults to 1 (callers log this).
/// `chain_balance` is the wallet's on-chain token balance, probed by the
/// caller only when the pair has no buy history.
pub fn compute_sell(
    position: Option<&Position>,
    wallet: &WalletAddress,
    token: &TokenAddress,
    amount: f64,
    sell_value_usd: f64,
    coin_price_usd: Option<f64>,
    chain_balance: Option<f64>,
) -> Result<SellOutcome, LedgerError> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(LedgerError::InvalidAmount(amount));
    }
    ensure_finite(sell_value_usd, "sell_value_usd")?;

    let sold_before = position.map(|p| p.total_tokens_sold).unwrap_or(0.0);
    let sold_after = sold_before + amount;

    let mut set_initial = None;

    let tracked = position.filter(|p| p.has_buy_history());
    let (branch, cost_basis, entry_price, remaining_after) = if let Some(p) = tracked {
        let cost_basis = ensure_finite(p.avg_entry_price * amount, "cost_basis")?;
        let remaining = ensure_finite(p.total_tokens_bought - sold_after, "remaining_balance")?;
        (SellBranch::Tracked, cost_basis, p.avg_entry_price, remaining)
    } else {
        // Untracked branch: the average entry price is unknown here and is
        // never applied; basis comes from the one-time initial capture.
        let existing_initial = position.and_then(|p| p.initial_balance);
        let initial_balance = match existing_initial {
            Some(b) => Some(b),
            None => {
                let probed = chain_balance.filter(|b| *b > 0.0);
                if let Some(b) = probed {
                    set_initial = Some((b, 0.0));
                }
                probed
            }
        };

        match initial_balance {
            Some(balance) => {
                let basis = position
                    .and_then(|p| p.initial_cost_basis)
                    .unwrap_or(0.0);
                let remaining = (balance - sold_after).max(0.0);
                (SellBranch::UntrackedWithBalance, basis, 0.0, remaining)
            }
            None => (SellBranch::UntrackedNoBalance, 0.0, 0.0, 0.0),
        }
    };

    let profit_usd = ensure_finite(sell_value_usd - cost_basis, "profit_usd")?;
    let rate = coin_price_usd.filter(|r| *r > 0.0).unwrap_or(1.0);
    let profit_coin = ensure_finite(profit_usd / rate, "profit")?;

    Ok(SellOutcome {
        delta: PositionDelta {
            wallet_address: wallet.clone(),
            token_address: token.clone(),
            d_tokens_bought: 0.0,
            d_cost_basis: 0.0,
            d_tokens_sold: amount,
            set_initial,
        },
        branch,
        cost_basis,
        profit_usd,
        profit_coin,
        entry_price,
        remaining_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    fn wallet() -> WalletAddress {
        WalletAddress::new("wallet1".to_string())
    }

    fn token() -> TokenAddress {
        TokenAddress::new("mint1".to_string())
    }

    fn tracked_position(bought: f64, cost: f64, sold: f64) -> Position {
        let mut p = Position::empty(wallet(), token(), TimeMs::new(0));
        p.total_tokens_bought = bought;
        p.total_cost_basis = cost;
        p.avg_entry_price = if bought > 0.0 { cost / bought } else { 0.0 };
        p.total_tokens_sold = sold;
        p.remaining_balance = bought - sold;
        p
    }

    #[test]
    fn test_first_buy_sets_average() {
        let outcome = compute_buy(None, &wallet(), &token(), 100.0, 50.0).unwrap();
        assert_eq!(outcome.avg_entry_price_after, 0.5);
        assert_eq!(outcome.remaining_after, 100.0);
        assert_eq!(outcome.delta.d_tokens_bought, 100.0);
        assert_eq!(outcome.delta.d_cost_basis, 50.0);
    }

    #[test]
    fn test_weighted_average_across_buys() {
        // q1@p1 = 10 @ 2.0, q2@p2 = 30 @ 4.0 -> avg = (20 + 120) / 40 = 3.5
        let p = tracked_position(10.0, 20.0, 0.0);
        let outcome = compute_buy(Some(&p), &wallet(), &token(), 30.0, 120.0).unwrap();
        assert!((outcome.avg_entry_price_after - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_tracked_sell_profit() {
        // avg 0.5, sell 40 @ 0.8 -> basis 20, profit 12
        let p = tracked_position(100.0, 50.0, 0.0);
        let outcome = compute_sell(
            Some(&p),
            &wallet(),
            &token(),
            40.0,
            32.0,
            Some(2.0),
            None,
        )
        .unwrap();
        assert_eq!(outcome.branch, SellBranch::Tracked);
        assert!((outcome.cost_basis - 20.0).abs() < 1e-12);
        assert!((outcome.profit_usd - 12.0).abs() < 1e-12);
        assert!((outcome.profit_coin - 6.0).abs() < 1e-12);
        assert!((outcome.remaining_after - 60.0).abs() < 1e-12);
        assert_eq!(outcome.entry_price, 0.5);
    }

    #[test]
    fn test_sell_does_not_change_average() {
        let p = tracked_position(100.0, 50.0, 0.0);
        let outcome =
            compute_sell(Some(&p), &wallet(), &token(), 40.0, 32.0, None, None).unwrap();
        assert_eq!(outcome.delta.d_cost_basis, 0.0);
        assert_eq!(outcome.delta.d_tokens_bought, 0.0);
    }

    #[test]
    fn test_untracked_sell_with_balance() {
        let outcome =
            compute_sell(None, &wallet(), &token(), 40.0, 32.0, Some(1.0), Some(500.0)).unwrap();
        assert_eq!(outcome.branch, SellBranch::UntrackedWithBalance);
        assert_eq!(outcome.cost_basis, 0.0);
        assert_eq!(outcome.profit_usd, 32.0);
        assert_eq!(outcome.remaining_after, 460.0);
        assert_eq!(outcome.delta.set_initial, Some((500.0, 0.0)));
    }

    #[test]
    fn test_untracked_sell_no_balance() {
        let outcome = compute_sell(None, &wallet(), &token(), 40.0, 32.0, None, None).unwrap();
        assert_eq!(outcome.branch, SellBranch::UntrackedNoBalance);
        assert_eq!(outcome.cost_basis, 0.0);
        assert_eq!(outcome.profit_usd, 32.0);
        assert_eq!(outcome.remaining_after, 0.0);
        assert_eq!(outcome.delta.set_initial, None);
    }

    #[test]
    fn test_untracked_sell_reuses_existing_initial() {
        let mut p = Position::empty(wallet(), token(), TimeMs::new(0));
        p.initial_balance = Some(200.0);
        p.initial_cost_basis = Some(10.0);
        p.total_tokens_sold = 50.0;

        let outcome =
            compute_sell(Some(&p), &wallet(), &token(), 40.0, 32.0, None, None).unwrap();
        assert_eq!(outcome.branch, SellBranch::UntrackedWithBalance);
        assert_eq!(outcome.cost_basis, 10.0);
        assert_eq!(outcome.remaining_after, 110.0);
        // Initial fields are captured only once.
        assert_eq!(outcome.delta.set_initial, None);
    }

    #[test]
    fn test_missing_coin_price_defaults_rate_to_one() {
        let p = tracked_position(100.0, 50.0, 0.0);
        let outcome =
            compute_sell(Some(&p), &wallet(), &token(), 40.0, 32.0, None, None).unwrap();
        assert_eq!(outcome.profit_coin, outcome.profit_usd);
    }

    #[test]
    fn test_non_finite_sell_value_rejected() {
        let p = tracked_position(100.0, 50.0, 0.0);
        let err = compute_sell(
            Some(&p),
            &wallet(),
            &token(),
            40.0,
            f64::INFINITY,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::NonFinite(_)));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = compute_buy(None, &wallet(), &token(), 0.0, 1.0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn test_delta_negation_drops_initial_capture() {
        let outcome =
            compute_sell(None, &wallet(), &token(), 40.0, 32.0, None, Some(100.0)).unwrap();
        let reversed = outcome.delta.negated();
        assert_eq!(reversed.d_tokens_sold, -40.0);
        assert_eq!(reversed.set_initial, None);
    }
}
