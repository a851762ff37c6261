//! JSON-RPC chain client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::classifier::parse_ui_amount;

use super::{ChainClient, ChainError};

const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Chain client speaking JSON-RPC over HTTP.
///
/// Every call is bounded by a per-attempt timeout and retried with
/// exponential backoff up to a fixed attempt cap. Only transient errors
/// (network, 429, 5xx) are retried.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    client: Client,
    url: String,
    attempts: u32,
}

impl RpcChainClient {
    pub fn new(url: String, timeout: Duration, attempts: u32) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            url,
            attempts: attempts.max(1),
        })
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut backoff = Duration::from_millis(500);
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match self.rpc_call_once(&payload).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.attempts => {
                    warn!(method, attempt, %error, "rpc call failed, retrying");
                    last_error = Some(error);
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(error) if error.is_transient() => {
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(ChainError::AttemptsExhausted(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        ))
    }

    async fn rpc_call_once(&self, payload: &Value) -> Result<Value, ChainError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChainError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::HttpError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChainError::ParseError(e.to_string()))?;

        if let Some(error) = body.get("error") {
            return Err(ChainError::RpcError {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| ChainError::ParseError("response missing result".to_string()))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn fetch_transaction(&self, signature: &str) -> Result<Option<Value>, ChainError> {
        debug!(signature, "fetching transaction");
        let result = self
            .rpc_call(
                "getTransaction",
                json!([
                    signature,
                    {"encoding": "jsonParsed", "maxSupportedTransactionVersion": 0}
                ]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(result))
    }

    async fn get_sol_balance(&self, wallet: &str) -> Result<f64, ChainError> {
        let result = self.rpc_call("getBalance", json!([wallet])).await?;
        let lamports = result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| ChainError::ParseError("getBalance missing value".to_string()))?;
        Ok(lamports as f64 / 1_000_000_000.0)
    }

    async fn get_token_balance(&self, wallet: &str, mint: &str) -> Result<f64, ChainError> {
        let result = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([
                    wallet,
                    {"mint": mint, "programId": TOKEN_PROGRAM_ID},
                    {"encoding": "jsonParsed"}
                ]),
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ChainError::ParseError("getTokenAccountsByOwner missing value".to_string())
            })?;

        let mut total = 0.0;
        for account in accounts {
            let amount = account
                .pointer("/account/data/parsed/info/tokenAmount")
                .and_then(|v| parse_ui_amount(Some(v)));
            if let Some(amount) = amount {
                total += amount;
            }
        }
        Ok(total)
    }
}
