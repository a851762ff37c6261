use axum::http::StatusCode;
use serde_json::Value;
use soltrack::api;
use soltrack::config::Config;
use soltrack::db::init_db;
use soltrack::dedup::{DedupGate, MemoryDedupStore};
use soltrack::domain::{
    Signature, TimeMs, TokenAddress, Trade, TradeEvent, TradeStatus, WalletAddress, SOL_MINT,
    USDC_MINT, USDT_MINT,
};
use soltrack::ledger::PositionDelta;
use soltrack::queue::JobQueue;
use soltrack::stream::{MonitorSupervisor, StreamConfig};
use soltrack::Repository;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

const WALLET: &str = "walletPubkey111";
const MINT_A: &str = "mintAAA";

struct TestApp {
    app: axum::Router,
    repo: Arc<Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        rpc_http_url: "http://example.invalid".to_string(),
        rpc_ws_url: "ws://example.invalid".to_string(),
        resolver_api_url: "http://example.invalid".to_string(),
        notifier_webhook_url: None,
        worker_count: 1,
        job_max_attempts: 3,
        rate_limit_jobs_per_sec: 10,
        rate_limit_burst: 10,
        claim_ttl_ms: 300_000,
        queued_ttl_ms: 600_000,
        fetch_timeout_ms: 15_000,
        fetch_attempts: 3,
        reconnect_delay_ms: 5_000,
        heartbeat_interval_ms: 30_000,
        quote_mints: vec![
            SOL_MINT.to_string(),
            USDC_MINT.to_string(),
            USDT_MINT.to_string(),
        ],
    };

    let (queue, _receiver) = JobQueue::new(16);
    let gate = DedupGate::new(
        Arc::new(MemoryDedupStore::new()),
        Duration::from_millis(config.claim_ttl_ms),
        Duration::from_millis(config.queued_ttl_ms),
    );
    let supervisor = Arc::new(MonitorSupervisor::new(
        StreamConfig {
            ws_url: config.rpc_ws_url.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
        },
        queue.clone(),
        gate,
        Arc::clone(&repo),
    ));

    let state = api::AppState::new(Arc::clone(&repo), config, supervisor, queue);
    let app = api::create_router(state);

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

fn buy_trade(sig: &str, time_ms: i64) -> Trade {
    Trade {
        signature: Signature::new(sig.to_string()),
        wallet_address: WalletAddress::new(WALLET.to_string()),
        trade_event: TradeEvent::Buy,
        token_address: TokenAddress::new(MINT_A.to_string()),
        token_symbol: "AAA".to_string(),
        quantity: 0.5,
        quantity_usd: 50.0,
        token_amount: 100.0,
        wallet_balance: Some(3.0),
        status: TradeStatus::Completed,
        time_ms: TimeMs::new(time_ms),
        profit: None,
        profit_usd: None,
        cost_basis: None,
        remaining_balance: None,
        entry_price: None,
    }
}

fn buy_delta(amount: f64, usd: f64) -> PositionDelta {
    PositionDelta {
        wallet_address: WalletAddress::new(WALLET.to_string()),
        token_address: TokenAddress::new(MINT_A.to_string()),
        d_tokens_bought: amount,
        d_cost_basis: usd,
        d_tokens_sold: 0.0,
        set_initial: None,
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_and_ready() {
    let test_app = setup_test_app().await;
    let (status, body) = get(test_app.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(test_app.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_trades_endpoint_returns_committed_trades() {
    let test_app = setup_test_app().await;

    for (i, sig) in ["sig1", "sig2", "sig3"].iter().enumerate() {
        test_app
            .repo
            .commit_trades_atomic(
                &Signature::new(sig.to_string()),
                &[(buy_trade(sig, 1000 + i as i64), buy_delta(100.0, 50.0))],
                TimeMs::new(1000 + i as i64),
            )
            .await
            .unwrap();
    }

    let (status, body) = get(
        test_app.app,
        &format!("/v1/trades?walletAddress={}&page=1&limit=2", WALLET),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["trades"].as_array().unwrap().len(), 2);
    // Newest first.
    assert_eq!(body["trades"][0]["signature"], "sig3");
    assert_eq!(body["trades"][0]["tradeEvent"], "BUY");
    assert_eq!(body["trades"][0]["quantityUsd"], 50.0);
}

#[tokio::test]
async fn test_trades_endpoint_requires_wallet() {
    let test_app = setup_test_app().await;
    let (status, _) = get(test_app.app, "/v1/trades?walletAddress=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_positions_endpoint() {
    let test_app = setup_test_app().await;
    test_app
        .repo
        .commit_trades_atomic(
            &Signature::new("sig1".to_string()),
            &[(buy_trade("sig1", 1000), buy_delta(100.0, 50.0))],
            TimeMs::new(1000),
        )
        .await
        .unwrap();

    let (status, body) = get(
        test_app.app,
        &format!("/v1/positions?walletAddress={}", WALLET),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let positions = body["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0]["tokenAddress"], MINT_A);
    assert_eq!(positions[0]["totalTokensBought"], 100.0);
    assert_eq!(positions[0]["avgEntryPrice"], 0.5);
}

#[tokio::test]
async fn test_positions_endpoint_empty_for_unknown_wallet() {
    let test_app = setup_test_app().await;
    let (status, body) = get(test_app.app, "/v1/positions?walletAddress=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["positions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_monitor_status_reflects_lifecycle() {
    let test_app = setup_test_app().await;

    let (status, body) = get(test_app.app.clone(), "/v1/monitor/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monitoring"], false);

    let (status, body) = post(
        test_app.app.clone(),
        "/v1/monitor/start",
        serde_json::json!({"walletAddress": WALLET}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], true);

    // Starting the same wallet again is a no-op.
    let (_, body) = post(
        test_app.app.clone(),
        "/v1/monitor/start",
        serde_json::json!({"walletAddress": WALLET}),
    )
    .await;
    assert_eq!(body["started"], false);

    let (_, body) = get(test_app.app.clone(), "/v1/monitor/status").await;
    assert_eq!(body["monitoring"], true);
    assert_eq!(body["walletAddress"], WALLET);

    let (status, body) = post(
        test_app.app.clone(),
        "/v1/monitor/stop",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);

    let (_, body) = get(test_app.app, "/v1/monitor/status").await;
    assert_eq!(body["monitoring"], false);
}

#[tokio::test]
async fn test_monitor_start_rejects_empty_wallet() {
    let test_app = setup_test_app().await;
    let (status, _) = post(
        test_app.app,
        "/v1/monitor/start",
        serde_json::json!({"walletAddress": "  "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
