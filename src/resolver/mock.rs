//! Mock token resolver for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ResolverError, TokenData, TokenMetadata, TokenResolver};

#[derive(Debug, Default)]
pub struct MockTokenResolver {
    tokens: Mutex<HashMap<String, TokenData>>,
    native_price: Mutex<Option<f64>>,
}

impl MockTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, address: &str, symbol: &str, price_usd: Option<f64>) {
        self.tokens.lock().unwrap().insert(
            address.to_string(),
            TokenData {
                price_usd,
                symbol: Some(symbol.to_string()),
                name: Some(symbol.to_string()),
            },
        );
    }

    pub fn set_native_price(&self, price: f64) {
        *self.native_price.lock().unwrap() = Some(price);
    }
}

#[async_trait]
impl TokenResolver for MockTokenResolver {
    async fn get_token_data(&self, address: &str) -> Result<TokenData, ResolverError> {
        self.tokens
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ResolverError::NotFound(address.to_string()))
    }

    async fn get_token_metadata(&self, address: &str) -> Result<TokenMetadata, ResolverError> {
        let data = self.get_token_data(address).await?;
        match (data.symbol, data.name) {
            (Some(symbol), Some(name)) => Ok(TokenMetadata { symbol, name }),
            _ => Err(ResolverError::NotFound(address.to_string())),
        }
    }

    async fn get_native_price(&self) -> Result<f64, ResolverError> {
        self.native_price
            .lock()
            .unwrap()
            .ok_or_else(|| ResolverError::NetworkError("no native price scripted".to_string()))
    }
}
