//! Wallet transaction stream.
//!
//! One websocket subscription per monitored wallet. The session reconnects
//! with a fixed delay, answers server pings, sends its own heartbeat, and
//! pushes accepted signatures through the dedup gate into the work queue.

pub mod supervisor;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::classifier::account_keys;
use crate::db::Repository;
use crate::dedup::DedupGate;
use crate::domain::{Signature, WalletAddress};
use crate::queue::{Job, JobQueue};

pub use supervisor::{MonitorStatus, MonitorSupervisor};

/// Connection knobs for a stream session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub ws_url: String,
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
}

/// A running subscription for one wallet.
pub struct StreamSession {
    config: StreamConfig,
    wallet: WalletAddress,
    queue: JobQueue,
    gate: DedupGate,
    repo: Arc<Repository>,
    shutdown: watch::Receiver<bool>,
}

impl StreamSession {
    pub fn new(
        config: StreamConfig,
        wallet: WalletAddress,
        queue: JobQueue,
        gate: DedupGate,
        repo: Arc<Repository>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            wallet,
            queue,
            gate,
            repo,
            shutdown,
        }
    }

    /// Run until shutdown is signalled. Reconnects forever on any failure.
    pub async fn run(mut self) {
        info!(wallet = %self.wallet, "stream session starting");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            if let Err(error) = self.run_connection().await {
                warn!(wallet = %self.wallet, %error, "stream connection lost");
            }
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = time::sleep(self.config.reconnect_delay) => {}
            }
        }
        info!(wallet = %self.wallet, "stream session stopped");
    }

    async fn run_connection(&mut self) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let (mut ws, _response) = connect_async(&self.config.ws_url).await?;

        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "transactionSubscribe",
            "params": [
                {"accountInclude": [self.wallet.as_str()], "failed": false},
                {"commitment": "confirmed", "encoding": "jsonParsed",
                 "transactionDetails": "full", "maxSupportedTransactionVersion": 0}
            ]
        });
        ws.send(Message::Text(subscribe.to_string())).await?;
        info!(wallet = %self.wallet, "subscription request sent");

        let mut heartbeat = time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    let _ = ws.send(Message::Close(None)).await;
                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    ws.send(Message::Ping(Vec::new())).await?;
                }
                message = ws.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text).await,
                        Some(Ok(Message::Ping(payload))) => {
                            ws.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(wallet = %self.wallet, ?frame, "server closed stream");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => return Err(error),
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        let Some((signature, envelope)) = parse_notification(text) else {
            return;
        };

        // The subscription filter is advisory; verify the wallet really
        // appears and the transaction succeeded before spending a job on it.
        if !account_keys(&envelope)
            .iter()
            .any(|key| key == self.wallet.as_str())
        {
            return;
        }
        if envelope
            .pointer("/meta/err")
            .map(|err| !err.is_null())
            .unwrap_or(false)
        {
            debug!(signature = %signature, "dropping failed transaction");
            return;
        }

        match self.repo.trade_exists(&signature).await {
            Ok(true) => {
                debug!(signature = %signature, "already persisted, dropping");
                return;
            }
            Ok(false) => {}
            Err(error) => {
                // Enqueue anyway; the worker re-checks before committing.
                warn!(signature = %signature, %error, "trade existence check failed");
            }
        }

        if !self.gate.mark_queued(&signature).await {
            debug!(signature = %signature, "already queued, dropping");
            return;
        }

        let job = Job {
            signature: signature.clone(),
            wallet_address: self.wallet.clone(),
            transaction_data: Some(envelope),
        };
        if !self.queue.enqueue(job).await {
            self.gate.release(&signature).await;
        }
    }
}

/// Parse a stream message into (signature, transaction envelope).
///
/// Subscription acknowledgments (`result` + `id`) and unrelated methods are
/// ignored. The envelope is the `{transaction, meta}` object the classifier
/// and the worker consume.
pub fn parse_notification(text: &str) -> Option<(Signature, Value)> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "skipping invalid stream message json");
            return None;
        }
    };

    if let (Some(id), Some(result)) = (value.get("id"), value.get("result")) {
        if id.is_number() {
            debug!(id = ?id, subscription = ?result, "subscription acknowledged");
        }
        return None;
    }

    if value.get("method").and_then(Value::as_str) != Some("transactionNotification") {
        return None;
    }

    let result = value.pointer("/params/result")?;
    let signature = result.get("signature")?.as_str()?.to_string();
    let envelope = result.get("transaction")?.clone();
    Some((Signature::new(signature), envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(signature: &str, err: Value, keys: Vec<&str>) -> String {
        json!({
            "jsonrpc": "2.0",
            "method": "transactionNotification",
            "params": {
                "subscription": 42,
                "result": {
                    "signature": signature,
                    "transaction": {
                        "transaction": {"message": {"accountKeys": keys.iter()
                            .map(|k| json!({"pubkey": k})).collect::<Vec<_>>()}},
                        "meta": {"err": err}
                    }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_parse_notification_extracts_signature_and_envelope() {
        let text = notification("sig1", Value::Null, vec!["walletA"]);
        let (signature, envelope) = parse_notification(&text).unwrap();
        assert_eq!(signature.as_str(), "sig1");
        assert_eq!(account_keys(&envelope), vec!["walletA"]);
        assert!(envelope.pointer("/meta/err").unwrap().is_null());
    }

    #[test]
    fn test_parse_notification_ignores_ack() {
        let ack = json!({"jsonrpc": "2.0", "id": 1, "result": 42}).to_string();
        assert!(parse_notification(&ack).is_none());
    }

    #[test]
    fn test_parse_notification_ignores_other_methods() {
        let other = json!({
            "jsonrpc": "2.0",
            "method": "slotNotification",
            "params": {"result": {"slot": 1}}
        })
        .to_string();
        assert!(parse_notification(&other).is_none());
    }

    #[test]
    fn test_parse_notification_rejects_garbage() {
        assert!(parse_notification("not json").is_none());
        assert!(parse_notification("{}").is_none());
    }
}
