//! Domain primitives: Signature, WalletAddress, TokenAddress, TimeMs, TradeEvent.

use serde::{Deserialize, Serialize};

/// Transaction signature; the natural idempotency key of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature(pub String);

impl Signature {
    /// Create a Signature from a string.
    pub fn new(sig: String) -> Self {
        Signature(sig)
    }

    /// Get the signature as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monitored wallet address (base58 string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Create a WalletAddress from a string.
    pub fn new(addr: String) -> Self {
        WalletAddress(addr)
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SPL token mint address (base58 string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAddress(pub String);

impl TokenAddress {
    /// Create a TokenAddress from a string.
    pub fn new(mint: String) -> Self {
        TokenAddress(mint)
    }

    /// Get the mint as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Direction of a classified trade relative to the quote-token set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeEvent {
    Buy,
    Sell,
}

impl TradeEvent {
    /// Stable lowercase identifier used in database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeEvent::Buy => "buy",
            TradeEvent::Sell => "sell",
        }
    }

    /// Parse the database identifier back to a TradeEvent.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(TradeEvent::Buy),
            "sell" => Some(TradeEvent::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
