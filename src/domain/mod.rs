//! Domain types for the wallet trade-ledger pipeline.
//!
//! This module provides:
//! - Domain primitives: Signature, WalletAddress, TokenAddress, TimeMs
//! - Swap leg types produced by the classifier
//! - Trade and Position records persisted by the ledger

pub mod position;
pub mod primitives;
pub mod swap;
pub mod trade;

pub use position::Position;
pub use primitives::{Signature, TimeMs, TokenAddress, TradeEvent, WalletAddress};
pub use swap::{SwapLeg, SwapLegs};
pub use trade::{Trade, TradeStatus};

/// Mint address of wrapped SOL, the native quote asset.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint address.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// USDT mint address.
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
