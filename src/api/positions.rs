use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{Position, WalletAddress};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub positions: Vec<Position>,
}

pub async fn get_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    if params.wallet_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "walletAddress must not be empty".to_string(),
        ));
    }

    let wallet = WalletAddress::new(params.wallet_address.trim().to_string());
    let positions = state.repo.list_positions(&wallet).await?;
    Ok(Json(PositionsResponse { positions }))
}
