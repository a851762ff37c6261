//! Signature deduplication.
//!
//! Three guards keep a signature from being processed twice: a "queued"
//! marker set when the listener enqueues it, the persisted trade check done
//! by the pipeline, and a processing claim taken by the worker. Both markers
//! carry a TTL so a crashed worker never wedges a signature permanently.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::Signature;

/// TTL'd key-presence store backing the dedup gate.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Set the key if absent (or expired). Returns true when this call set it.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> bool;
    async fn contains(&self, key: &str) -> bool;
    async fn remove(&self, key: &str);
}

/// In-process store. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryDedupStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => false,
            _ => {
                entries.insert(key.to_string(), now + ttl);
                true
            }
        }
    }

    async fn contains(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

/// Queue-side and worker-side dedup guards over one shared store.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn DedupStore>,
    claim_ttl: Duration,
    queued_ttl: Duration,
}

impl DedupGate {
    pub fn new(store: Arc<dyn DedupStore>, claim_ttl: Duration, queued_ttl: Duration) -> Self {
        DedupGate {
            store,
            claim_ttl,
            queued_ttl,
        }
    }

    fn queued_key(signature: &Signature) -> String {
        format!("queued:{}", signature.as_str())
    }

    fn claim_key(signature: &Signature) -> String {
        format!("claim:{}", signature.as_str())
    }

    /// Listener-side guard: mark the signature as queued. Returns false when
    /// it is already in flight.
    pub async fn mark_queued(&self, signature: &Signature) -> bool {
        self.store
            .set_if_absent(&Self::queued_key(signature), self.queued_ttl)
            .await
    }

    /// Worker-side guard: take the processing claim. Returns false when
    /// another worker holds it.
    pub async fn try_claim(&self, signature: &Signature) -> bool {
        self.store
            .set_if_absent(&Self::claim_key(signature), self.claim_ttl)
            .await
    }

    /// Drop both markers. Called on every job exit path, success or not.
    pub async fn release(&self, signature: &Signature) {
        self.store.remove(&Self::claim_key(signature)).await;
        self.store.remove(&Self::queued_key(signature)).await;
    }
}
