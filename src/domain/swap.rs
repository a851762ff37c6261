//! Swap leg types produced by classification.

use super::TokenAddress;

/// One side of a swap: the token spent or received by the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapLeg {
    pub token: TokenAddress,
    /// Amount in UI units (already adjusted for token decimals).
    pub amount: f64,
    /// Best-effort symbol; None until metadata resolution runs.
    pub symbol: Option<String>,
}

impl SwapLeg {
    pub fn new(token: TokenAddress, amount: f64) -> Self {
        Self {
            token,
            amount,
            symbol: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

/// Both legs of a swap. `token_in` is what the wallet spent, `token_out`
/// what it received.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapLegs {
    pub token_in: SwapLeg,
    pub token_out: SwapLeg,
}

impl SwapLegs {
    pub fn new(token_in: SwapLeg, token_out: SwapLeg) -> Self {
        Self {
            token_in,
            token_out,
        }
    }
}
