use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{SOL_MINT, USDC_MINT, USDT_MINT};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub rpc_http_url: String,
    pub rpc_ws_url: String,
    pub resolver_api_url: String,
    pub notifier_webhook_url: Option<String>,

    pub worker_count: usize,
    pub job_max_attempts: u32,
    pub rate_limit_jobs_per_sec: u64,
    pub rate_limit_burst: u64,

    pub claim_ttl_ms: u64,
    pub queued_ttl_ms: u64,

    pub fetch_timeout_ms: u64,
    pub fetch_attempts: u32,

    pub reconnect_delay_ms: u64,
    pub heartbeat_interval_ms: u64,

    /// Mints treated as quote assets when labeling trade direction.
    pub quote_mints: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_env<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string()))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_env(&env_map, "PORT", "8080", "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let rpc_http_url = env_map
            .get("RPC_HTTP_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_HTTP_URL".to_string()))?;

        let rpc_ws_url = env_map
            .get("RPC_WS_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_WS_URL".to_string()))?;

        let resolver_api_url = env_map
            .get("RESOLVER_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.jup.ag".to_string());

        let notifier_webhook_url = env_map
            .get("NOTIFIER_WEBHOOK_URL")
            .filter(|s| !s.is_empty())
            .cloned();

        let worker_count: usize =
            parse_env(&env_map, "WORKER_COUNT", "4", "must be a valid usize")?;
        if worker_count == 0 {
            return Err(ConfigError::InvalidValue(
                "WORKER_COUNT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let job_max_attempts = parse_env(&env_map, "JOB_MAX_ATTEMPTS", "3", "must be a valid u32")?;
        let rate_limit_jobs_per_sec = parse_env(
            &env_map,
            "RATE_LIMIT_JOBS_PER_SEC",
            "10",
            "must be a valid u64",
        )?;
        let rate_limit_burst =
            parse_env(&env_map, "RATE_LIMIT_BURST", "10", "must be a valid u64")?;

        let claim_ttl_ms = parse_env(&env_map, "CLAIM_TTL_MS", "300000", "must be a valid u64")?;
        let queued_ttl_ms = parse_env(&env_map, "QUEUED_TTL_MS", "600000", "must be a valid u64")?;

        let fetch_timeout_ms =
            parse_env(&env_map, "FETCH_TIMEOUT_MS", "15000", "must be a valid u64")?;
        let fetch_attempts = parse_env(&env_map, "FETCH_ATTEMPTS", "3", "must be a valid u32")?;

        let reconnect_delay_ms =
            parse_env(&env_map, "RECONNECT_DELAY_MS", "5000", "must be a valid u64")?;
        let heartbeat_interval_ms = parse_env(
            &env_map,
            "HEARTBEAT_INTERVAL_MS",
            "30000",
            "must be a valid u64",
        )?;

        let quote_mints = match env_map.get("QUOTE_MINTS") {
            Some(csv) => {
                let mints: Vec<String> = csv
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if mints.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "QUOTE_MINTS".to_string(),
                        "must contain at least one mint".to_string(),
                    ));
                }
                mints
            }
            None => vec![
                SOL_MINT.to_string(),
                USDC_MINT.to_string(),
                USDT_MINT.to_string(),
            ],
        };

        Ok(Config {
            port,
            database_path,
            rpc_http_url,
            rpc_ws_url,
            resolver_api_url,
            notifier_webhook_url,
            worker_count,
            job_max_attempts,
            rate_limit_jobs_per_sec,
            rate_limit_burst,
            claim_ttl_ms,
            queued_ttl_ms,
            fetch_timeout_ms,
            fetch_attempts,
            reconnect_delay_ms,
            heartbeat_interval_ms,
            quote_mints,
        })
    }
}
