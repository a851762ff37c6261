//! HTTP token resolver against a price/metadata aggregator API.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::SOL_MINT;

use super::{ResolverError, TokenData, TokenMetadata, TokenResolver};

/// Resolver backed by an HTTP aggregator (Jupiter-compatible endpoints).
#[derive(Debug, Clone)]
pub struct HttpTokenResolver {
    client: Client,
    base_url: String,
}

impl HttpTokenResolver {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, ResolverError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(ResolverError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(ResolverError::HttpError {
                    status: status.as_u16(),
                    message: "Retryable error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ResolverError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ResolverError::ParseError(e.to_string())))
        })
        .await
    }

    fn parse_price(entry: &Value) -> Option<f64> {
        let price = entry.get("price")?;
        if let Some(price) = price.as_f64() {
            return Some(price);
        }
        price.as_str().and_then(|s| s.parse::<f64>().ok())
    }
}

#[async_trait]
impl TokenResolver for HttpTokenResolver {
    async fn get_token_data(&self, address: &str) -> Result<TokenData, ResolverError> {
        debug!(address, "resolving token data");
        let body = self.get_json(&format!("/price/v2?ids={}", address)).await?;

        let entry = body
            .pointer(&format!("/data/{}", address))
            .ok_or_else(|| ResolverError::NotFound(address.to_string()))?;

        let price_usd = Self::parse_price(entry);
        let metadata = self.get_token_metadata(address).await.ok();

        Ok(TokenData {
            price_usd,
            symbol: metadata.as_ref().map(|m| m.symbol.clone()),
            name: metadata.map(|m| m.name),
        })
    }

    async fn get_token_metadata(&self, address: &str) -> Result<TokenMetadata, ResolverError> {
        let body = self
            .get_json(&format!("/tokens/v1/token/{}", address))
            .await?;

        let symbol = body
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolverError::NotFound(address.to_string()))?
            .to_string();
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&symbol)
            .to_string();

        Ok(TokenMetadata { symbol, name })
    }

    async fn get_native_price(&self) -> Result<f64, ResolverError> {
        let body = self.get_json(&format!("/price/v2?ids={}", SOL_MINT)).await?;
        body.pointer(&format!("/data/{}", SOL_MINT))
            .and_then(Self::parse_price)
            .ok_or_else(|| ResolverError::ParseError("missing native price".to_string()))
    }
}
