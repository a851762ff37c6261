//! Chain access abstraction: transaction detail and balance lookups.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

pub mod mock;
pub mod rpc;

pub use mock::MockChainClient;
pub use rpc::RpcChainClient;

/// RPC-facing operations the pipeline needs.
#[async_trait]
pub trait ChainClient: Send + Sync + fmt::Debug {
    /// Fetch the parsed transaction for a signature.
    ///
    /// Returns `Ok(None)` when the node does not know the signature.
    async fn fetch_transaction(&self, signature: &str) -> Result<Option<Value>, ChainError>;

    /// Native coin balance of a wallet, in whole coins.
    async fn get_sol_balance(&self, wallet: &str) -> Result<f64, ChainError>;

    /// Total balance of one mint across the wallet's token accounts.
    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<f64, ChainError>;
}

/// Error type for chain operations.
#[derive(Debug, Clone)]
pub enum ChainError {
    /// Network error (connection failure, timeout, DNS)
    NetworkError(String),
    /// HTTP error from the RPC endpoint
    HttpError { status: u16, message: String },
    /// RPC-level error object in an otherwise successful response
    RpcError { code: i64, message: String },
    /// Invalid JSON or unexpected response shape
    ParseError(String),
    /// All attempts exhausted; wraps the last error seen
    AttemptsExhausted(String),
}

impl ChainError {
    /// Transient errors release the dedup claim so a redelivery can retry;
    /// permanent errors mean the request itself is wrong.
    pub fn is_transient(&self) -> bool {
        match self {
            ChainError::NetworkError(_) => true,
            ChainError::HttpError { status, .. } => *status == 429 || *status >= 500,
            ChainError::RpcError { .. } => false,
            ChainError::ParseError(_) => false,
            ChainError::AttemptsExhausted(_) => true,
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChainError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ChainError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            ChainError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ChainError::AttemptsExhausted(msg) => write!(f, "Attempts exhausted: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ChainError::NetworkError("timeout".to_string()).is_transient());
        assert!(ChainError::HttpError {
            status: 429,
            message: "rate limited".to_string()
        }
        .is_transient());
        assert!(ChainError::HttpError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_transient());
        assert!(!ChainError::HttpError {
            status: 400,
            message: "bad request".to_string()
        }
        .is_transient());
        assert!(!ChainError::ParseError("bad json".to_string()).is_transient());
    }

    #[test]
    fn test_chain_error_display() {
        let err = ChainError::RpcError {
            code: -32602,
            message: "invalid params".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32602: invalid params");
    }
}
