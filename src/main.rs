use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use soltrack::chain::{ChainClient, RpcChainClient};
use soltrack::dedup::{DedupGate, MemoryDedupStore};
use soltrack::notifier::{NullNotifier, TradeNotifier, WebhookNotifier};
use soltrack::queue::{spawn_workers, JobQueue, TokenBucketLimiter, WorkerConfig};
use soltrack::resolver::{HttpTokenResolver, TokenResolver};
use soltrack::stream::{MonitorSupervisor, StreamConfig};
use soltrack::{api, config::Config, db::init_db, Repository, SignatureProcessor};

const QUEUE_CAPACITY: usize = 10_000;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    let repo = Arc::new(Repository::new(pool));

    let chain: Arc<dyn ChainClient> = match RpcChainClient::new(
        config.rpc_http_url.clone(),
        Duration::from_millis(config.fetch_timeout_ms),
        config.fetch_attempts,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Failed to build RPC client: {}", e);
            std::process::exit(1);
        }
    };
    let resolver: Arc<dyn TokenResolver> =
        Arc::new(HttpTokenResolver::new(config.resolver_api_url.clone()));
    let notifier: Arc<dyn TradeNotifier> = match &config.notifier_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(NullNotifier),
    };

    let gate = DedupGate::new(
        Arc::new(MemoryDedupStore::new()),
        Duration::from_millis(config.claim_ttl_ms),
        Duration::from_millis(config.queued_ttl_ms),
    );

    let (queue, receiver) = JobQueue::new(QUEUE_CAPACITY);
    let limiter = TokenBucketLimiter::new(config.rate_limit_jobs_per_sec, config.rate_limit_burst);

    let processor = Arc::new(SignatureProcessor::new(
        Arc::clone(&repo),
        chain,
        resolver,
        notifier,
        gate.clone(),
        config.quote_mints.clone(),
    ));
    let _workers = spawn_workers(
        &queue,
        receiver,
        limiter,
        processor,
        WorkerConfig {
            worker_count: config.worker_count,
            max_attempts: config.job_max_attempts,
            initial_backoff: Duration::from_millis(500),
        },
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

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, supervisor, queue));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
