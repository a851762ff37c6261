//! Swap classification.
//!
//! Turns a parsed transaction into zero or more trade intents: extract the
//! two legs of the swap with an ordered strategy cascade, then label each
//! non-quote leg BUY or SELL against the configured quote-token set.

pub mod strategies;

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::domain::{SwapLeg, SwapLegs, TradeEvent, WalletAddress};

pub use strategies::{account_keys, parse_ui_amount};

/// One trade to record: the non-quote leg plus the opposite leg it was
/// exchanged for.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub event: TradeEvent,
    /// The leg the trade is recorded against.
    pub token: SwapLeg,
    /// The other side of the swap, used for valuation.
    pub counter: SwapLeg,
}

/// Outcome of classifying one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// One or two trade intents. Two when neither leg is a quote token.
    Swap(Vec<TradeIntent>),
    /// Both legs are quote tokens; carries no information worth recording.
    QuoteOnly,
    /// No strategy produced both legs.
    Unrecognized,
}

/// Stateless classifier parameterized by the quote-token set.
pub struct Classifier {
    quote_mints: HashSet<String>,
}

impl Classifier {
    pub fn new(quote_mints: impl IntoIterator<Item = String>) -> Self {
        Classifier {
            quote_mints: quote_mints.into_iter().collect(),
        }
    }

    fn is_quote(&self, leg: &SwapLeg) -> bool {
        self.quote_mints.contains(leg.token.as_str())
    }

    /// Extract swap legs with the first strategy that succeeds.
    pub fn extract_legs(&self, tx: &Value, wallet: &WalletAddress) -> Option<SwapLegs> {
        if let Some(legs) = strategies::strategy_swapped_tokens(tx) {
            debug!(strategy = "swapped_tokens", "extracted swap legs");
            return Some(legs);
        }
        if let Some(legs) = strategies::strategy_balance_changes(tx, wallet.as_str()) {
            debug!(strategy = "balance_changes", "extracted swap legs");
            return Some(legs);
        }
        if let Some(legs) = strategies::strategy_transfers(tx, wallet.as_str()) {
            debug!(strategy = "transfers", "extracted swap legs");
            return Some(legs);
        }
        None
    }

    /// Classify a parsed transaction into trade intents.
    pub fn classify(&self, tx: &Value, wallet: &WalletAddress) -> Classification {
        let legs = match self.extract_legs(tx, wallet) {
            Some(legs) => legs,
            None => return Classification::Unrecognized,
        };

        let in_quote = self.is_quote(&legs.token_in);
        let out_quote = self.is_quote(&legs.token_out);

        match (in_quote, out_quote) {
            (true, true) => Classification::QuoteOnly,
            // Spent quote, received something else: a buy of the received token.
            (true, false) => Classification::Swap(vec![TradeIntent {
                event: TradeEvent::Buy,
                token: legs.token_out,
                counter: legs.token_in,
            }]),
            // Spent something else for quote: a sell of the spent token.
            (false, true) => Classification::Swap(vec![TradeIntent {
                event: TradeEvent::Sell,
                token: legs.token_in,
                counter: legs.token_out,
            }]),
            // Neither leg is quote: record both sides of the rotation.
            (false, false) => Classification::Swap(vec![
                TradeIntent {
                    event: TradeEvent::Buy,
                    token: legs.token_out.clone(),
                    counter: legs.token_in.clone(),
                },
                TradeIntent {
                    event: TradeEvent::Sell,
                    token: legs.token_in,
                    counter: legs.token_out,
                },
            ]),
        }
    }
}
