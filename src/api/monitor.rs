use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::WalletAddress;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub started: bool,
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub monitoring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub queue_depth: usize,
}

pub async fn start_monitoring(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let wallet = request.wallet_address.trim();
    if wallet.is_empty() {
        return Err(AppError::BadRequest(
            "walletAddress must not be empty".to_string(),
        ));
    }

    let wallet = WalletAddress::new(wallet.to_string());
    let started = state.supervisor.start(wallet.clone()).await;
    Ok(Json(StartResponse {
        started,
        wallet_address: wallet.as_str().to_string(),
    }))
}

pub async fn stop_monitoring(State(state): State<AppState>) -> Json<StopResponse> {
    let stopped = state.supervisor.stop().await;
    Json(StopResponse { stopped })
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.supervisor.status().await;
    Json(StatusResponse {
        monitoring: status.monitoring,
        wallet_address: status.wallet_address,
        queue_depth: state.queue.depth(),
    })
}
