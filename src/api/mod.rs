pub mod health;
pub mod monitor;
pub mod positions;
pub mod trades;

use crate::config::Config;
use crate::db::Repository;
use crate::queue::JobQueue;
use crate::stream::MonitorSupervisor;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub supervisor: Arc<MonitorSupervisor>,
    pub queue: JobQueue,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        supervisor: Arc<MonitorSupervisor>,
        queue: JobQueue,
    ) -> Self {
        Self {
            repo,
            config,
            supervisor,
            queue,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/monitor/start", post(monitor::start_monitoring))
        .route("/v1/monitor/stop", post(monitor::stop_monitoring))
        .route("/v1/monitor/status", get(monitor::get_status))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/positions", get(positions::get_positions))
        .layer(cors)
        .with_state(state)
}
