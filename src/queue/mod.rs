//! Work queue and worker pool.
//!
//! Signatures accepted by the dedup gate are enqueued as jobs; a fixed pool
//! of workers pulls from the shared queue, bounded by a token-bucket limiter.
//! Only failed jobs are retried (exponential backoff, capped attempts); a job
//! that completes or intentionally skips is done. Correctness under retries
//! comes from the dedup gate and the unique-signature constraint, not from
//! queue semantics.

pub mod rate_limit;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::{Signature, WalletAddress};

pub use rate_limit::TokenBucketLimiter;

/// One unit of work: a signature to process, optionally carrying the already
/// delivered transaction payload so the worker can skip the RPC fetch.
#[derive(Debug, Clone)]
pub struct Job {
    pub signature: Signature,
    pub wallet_address: WalletAddress,
    pub transaction_data: Option<Value>,
}

/// Terminal result of a processed job. Neither variant is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyClaimed,
    AlreadyProcessed,
    FetchExhausted,
    OnChainFailure,
    Unrecognized,
    QuoteOnly,
}

/// Failures that make a job eligible for the retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("ledger computation failure: {0}")]
    Ledger(String),
}

/// Job body plugged into the worker pool.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &Job) -> Result<JobOutcome, ProcessError>;
}

/// Sending half of the queue plus a live depth gauge.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    depth: Arc<AtomicUsize>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            JobQueue {
                sender,
                depth: Arc::new(AtomicUsize::new(0)),
            },
            receiver,
        )
    }

    /// Enqueue a job. Returns false when the queue is closed or full.
    pub async fn enqueue(&self, job: Job) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(signature = %job.signature, "job queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    fn depth_gauge(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.depth)
    }
}

/// Retry/backoff knobs for the pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

/// Spawn the worker pool over the receiving half of the queue.
pub fn spawn_workers<P: JobProcessor + 'static>(
    queue: &JobQueue,
    receiver: mpsc::Receiver<Job>,
    limiter: Option<Arc<TokenBucketLimiter>>,
    processor: Arc<P>,
    config: WorkerConfig,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    let depth = queue.depth_gauge();

    (0..config.worker_count.max(1))
        .map(|worker_id| {
            let receiver = Arc::clone(&receiver);
            let limiter = limiter.clone();
            let processor = Arc::clone(&processor);
            let depth = Arc::clone(&depth);
            let config = config.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, receiver, limiter, processor, depth, config).await;
            })
        })
        .collect()
}

async fn worker_loop<P: JobProcessor>(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    limiter: Option<Arc<TokenBucketLimiter>>,
    processor: Arc<P>,
    depth: Arc<AtomicUsize>,
    config: WorkerConfig,
) {
    info!(worker_id, "worker started");
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let job = match job {
            Some(job) => job,
            None => break,
        };
        depth.fetch_sub(1, Ordering::Relaxed);

        if let Some(limiter) = &limiter {
            limiter.acquire().await;
        }

        run_with_retries(worker_id, &job, processor.as_ref(), &config).await;
    }
    info!(worker_id, "worker stopped");
}

async fn run_with_retries<P: JobProcessor>(
    worker_id: usize,
    job: &Job,
    processor: &P,
    config: &WorkerConfig,
) {
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = config.initial_backoff;

    for attempt in 1..=max_attempts {
        match processor.process(job).await {
            Ok(JobOutcome::Completed) => {
                info!(worker_id, signature = %job.signature, "job completed");
                return;
            }
            Ok(JobOutcome::Skipped(reason)) => {
                info!(worker_id, signature = %job.signature, ?reason, "job skipped");
                return;
            }
            Err(error) if attempt < max_attempts => {
                warn!(
                    worker_id,
                    signature = %job.signature,
                    attempt,
                    %error,
                    "job failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(error) => {
                error!(
                    worker_id,
                    signature = %job.signature,
                    attempts = max_attempts,
                    %error,
                    "job failed, attempts exhausted"
                );
            }
        }
    }
}
