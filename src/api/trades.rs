use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{Trade, WalletAddress};
use crate::error::AppError;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub wallet_address: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    if params.wallet_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "walletAddress must not be empty".to_string(),
        ));
    }

    let wallet = WalletAddress::new(params.wallet_address.trim().to_string());
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let (trades, total) = state.repo.query_trades(&wallet, page, limit).await?;

    Ok(Json(TradesResponse {
        trades,
        total,
        page,
        limit,
    }))
}
