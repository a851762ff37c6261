pub mod api;
pub mod chain;
pub mod classifier;
pub mod config;
pub mod db;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod stream;

pub use chain::{ChainClient, ChainError, MockChainClient, RpcChainClient};
pub use config::Config;
pub use db::{init_db, Repository};
pub use dedup::{DedupGate, DedupStore, MemoryDedupStore};
pub use domain::{
    Position, Signature, SwapLeg, SwapLegs, TimeMs, TokenAddress, Trade, TradeEvent, TradeStatus,
    WalletAddress,
};
pub use error::AppError;
pub use pipeline::SignatureProcessor;
