//! Monitor supervisor: at most one active stream session.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::db::Repository;
use crate::dedup::DedupGate;
use crate::domain::WalletAddress;
use crate::queue::JobQueue;

use super::{StreamConfig, StreamSession};

struct ActiveSession {
    wallet: WalletAddress,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Snapshot returned by status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub monitoring: bool,
    pub wallet_address: Option<String>,
}

/// Owns the single stream session. Starting a new wallet tears the old
/// session down first and waits for it to exit; starting the wallet already
/// being monitored is a no-op.
pub struct MonitorSupervisor {
    config: StreamConfig,
    queue: JobQueue,
    gate: DedupGate,
    repo: Arc<Repository>,
    active: Mutex<Option<ActiveSession>>,
}

impl MonitorSupervisor {
    pub fn new(
        config: StreamConfig,
        queue: JobQueue,
        gate: DedupGate,
        repo: Arc<Repository>,
    ) -> Self {
        Self {
            config,
            queue,
            gate,
            repo,
            active: Mutex::new(None),
        }
    }

    /// Begin monitoring a wallet. Returns true when a new session started,
    /// false when the wallet was already being monitored.
    pub async fn start(&self, wallet: WalletAddress) -> bool {
        let mut active = self.active.lock().await;

        if let Some(session) = active.as_ref() {
            if session.wallet == wallet {
                info!(wallet = %wallet, "already monitoring");
                return false;
            }
        }
        if let Some(old) = active.take() {
            Self::teardown(old).await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = StreamSession::new(
            self.config.clone(),
            wallet.clone(),
            self.queue.clone(),
            self.gate.clone(),
            Arc::clone(&self.repo),
            shutdown_rx,
        );
        let handle = tokio::spawn(session.run());

        *active = Some(ActiveSession {
            wallet,
            shutdown: shutdown_tx,
            handle,
        });
        true
    }

    /// Stop the active session, if any. Returns true when one was stopped.
    pub async fn stop(&self) -> bool {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(session) => {
                Self::teardown(session).await;
                true
            }
            None => false,
        }
    }

    pub async fn status(&self) -> MonitorStatus {
        let active = self.active.lock().await;
        MonitorStatus {
            monitoring: active.is_some(),
            wallet_address: active.as_ref().map(|s| s.wallet.as_str().to_string()),
        }
    }

    async fn teardown(session: ActiveSession) {
        info!(wallet = %session.wallet, "tearing down stream session");
        let _ = session.shutdown.send(true);
        let _ = session.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::dedup::MemoryDedupStore;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn supervisor() -> (MonitorSupervisor, TempDir) {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("test.db").to_string_lossy().to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));

        let (queue, _receiver) = JobQueue::new(16);
        let gate = DedupGate::new(
            Arc::new(MemoryDedupStore::new()),
            Duration::from_secs(300),
            Duration::from_secs(600),
        );
        // Unroutable endpoint: sessions spin on reconnect until torn down.
        let config = StreamConfig {
            ws_url: "ws://127.0.0.1:9".to_string(),
            reconnect_delay: Duration::from_millis(50),
            heartbeat_interval: Duration::from_secs(30),
        };
        (MonitorSupervisor::new(config, queue, gate, repo), temp)
    }

    #[tokio::test]
    async fn test_start_is_idempotent_for_same_wallet() {
        let (supervisor, _temp) = supervisor().await;
        let wallet = WalletAddress::new("walletA".to_string());

        assert!(supervisor.start(wallet.clone()).await);
        assert!(!supervisor.start(wallet).await);

        let status = supervisor.status().await;
        assert!(status.monitoring);
        assert_eq!(status.wallet_address.as_deref(), Some("walletA"));

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_new_wallet_replaces_old_session() {
        let (supervisor, _temp) = supervisor().await;

        assert!(supervisor.start(WalletAddress::new("walletA".to_string())).await);
        assert!(supervisor.start(WalletAddress::new("walletB".to_string())).await);

        let status = supervisor.status().await;
        assert_eq!(status.wallet_address.as_deref(), Some("walletB"));

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_without_session() {
        let (supervisor, _temp) = supervisor().await;
        assert!(!supervisor.stop().await);
        assert!(!supervisor.status().await.monitoring);
    }

    #[tokio::test]
    async fn test_stop_halts_session() {
        let (supervisor, _temp) = supervisor().await;
        assert!(supervisor.start(WalletAddress::new("walletA".to_string())).await);
        assert!(supervisor.stop().await);
        assert!(!supervisor.status().await.monitoring);
    }
}
