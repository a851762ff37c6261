//! Token metadata and price resolution.
//!
//! Resolver failures never abort the pipeline: call sites degrade symbols to
//! "Unknown" and prices to a logged fallback.

use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpTokenResolver;
pub use mock::MockTokenResolver;

/// Price and best-effort identity of a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenData {
    pub price_usd: Option<f64>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

/// Symbol and name of a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
}

#[async_trait]
pub trait TokenResolver: Send + Sync + fmt::Debug {
    /// Price plus identity for one token.
    async fn get_token_data(&self, address: &str) -> Result<TokenData, ResolverError>;

    /// Identity only.
    async fn get_token_metadata(&self, address: &str) -> Result<TokenMetadata, ResolverError>;

    /// USD price of the native coin.
    async fn get_native_price(&self) -> Result<f64, ResolverError>;
}

/// Error type for resolver operations.
#[derive(Debug, Clone)]
pub enum ResolverError {
    NetworkError(String),
    HttpError { status: u16, message: String },
    ParseError(String),
    NotFound(String),
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ResolverError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ResolverError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ResolverError::NotFound(address) => write!(f, "Token not found: {}", address),
        }
    }
}

impl std::error::Error for ResolverError {}
