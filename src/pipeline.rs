//! The worker job body: everything that happens to one claimed signature.
//!
//! Order matters here. The claim and persisted-trade guards run first, the
//! on-chain balance probe for untracked sells happens before the database
//! transaction opens, and the claim plus queued marker are released on every
//! exit path so no signature is ever permanently stuck.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::classifier::{account_keys, Classification, Classifier, TradeIntent};
use crate::db::Repository;
use crate::dedup::DedupGate;
use crate::domain::{SwapLeg, TimeMs, Trade, TradeEvent, TradeStatus, SOL_MINT};
use crate::ledger::{self, PositionDelta};
use crate::notifier::{NotifyError, TradeNotifier};
use crate::queue::{Job, JobOutcome, JobProcessor, ProcessError, SkipReason};
use crate::resolver::TokenResolver;

enum ResolvedTx {
    Found(Value),
    Skip(SkipReason),
}

/// Processes one signature end to end.
pub struct SignatureProcessor {
    repo: Arc<Repository>,
    chain: Arc<dyn ChainClient>,
    resolver: Arc<dyn TokenResolver>,
    notifier: Arc<dyn TradeNotifier>,
    classifier: Classifier,
    gate: DedupGate,
    quote_mints: HashSet<String>,
}

impl SignatureProcessor {
    pub fn new(
        repo: Arc<Repository>,
        chain: Arc<dyn ChainClient>,
        resolver: Arc<dyn TokenResolver>,
        notifier: Arc<dyn TradeNotifier>,
        gate: DedupGate,
        quote_mints: Vec<String>,
    ) -> Self {
        Self {
            repo,
            chain,
            resolver,
            notifier,
            classifier: Classifier::new(quote_mints.clone()),
            gate,
            quote_mints: quote_mints.into_iter().collect(),
        }
    }

    async fn process_claimed(&self, job: &Job) -> Result<JobOutcome, ProcessError> {
        let signature = &job.signature;

        let exists = self
            .repo
            .trade_exists(signature)
            .await
            .map_err(|e| ProcessError::Transient(e.to_string()))?;
        if exists {
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        let tx = match self.resolve_transaction(job).await {
            ResolvedTx::Found(tx) => tx,
            ResolvedTx::Skip(reason) => return Ok(JobOutcome::Skipped(reason)),
        };

        // No account keys means the payload is not a transaction we can read.
        if account_keys(&tx).is_empty() {
            return Ok(JobOutcome::Skipped(SkipReason::Unrecognized));
        }

        // Transactions that failed on chain carry no balance effects.
        let chain_failed = tx
            .pointer("/meta/err")
            .map(|err| !err.is_null())
            .unwrap_or(false);
        if chain_failed {
            return Ok(JobOutcome::Skipped(SkipReason::OnChainFailure));
        }

        let intents = match self.classifier.classify(&tx, &job.wallet_address) {
            Classification::Swap(intents) => intents,
            Classification::QuoteOnly => return Ok(JobOutcome::Skipped(SkipReason::QuoteOnly)),
            Classification::Unrecognized => {
                return Ok(JobOutcome::Skipped(SkipReason::Unrecognized))
            }
        };

        let native_price = match self.resolver.get_native_price().await {
            Ok(price) if price.is_finite() && price > 0.0 => Some(price),
            Ok(price) => {
                warn!(signature = %signature, price, "unusable native price, using rate 1");
                None
            }
            Err(error) => {
                warn!(signature = %signature, %error, "native price lookup failed, using rate 1");
                None
            }
        };

        let wallet_balance = match self.chain.get_sol_balance(job.wallet_address.as_str()).await {
            Ok(balance) => Some(balance),
            Err(error) => {
                warn!(signature = %signature, %error, "wallet balance lookup failed");
                None
            }
        };

        let now = TimeMs::now();
        let mut entries: Vec<(Trade, PositionDelta)> = Vec::with_capacity(intents.len());
        for intent in &intents {
            let entry = self
                .build_entry(job, intent, native_price, wallet_balance, now)
                .await?;
            entries.push(entry);
        }

        let receipt = self
            .repo
            .commit_trades_atomic(signature, &entries, now)
            .await
            .map_err(|e| ProcessError::Transient(e.to_string()))?;

        if receipt.receipts.is_empty() {
            // Every insert conflicted: another worker won the race.
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        for (trade, _) in &entries {
            match self.notifier.notify(trade).await {
                Ok(()) => {}
                Err(NotifyError::DuplicateContent) => {
                    info!(signature = %signature, "duplicate content reported, compensating");
                    self.repo
                        .revert_commit(&receipt, TimeMs::now())
                        .await
                        .map_err(|e| ProcessError::Transient(e.to_string()))?;
                    return Ok(JobOutcome::Completed);
                }
                Err(error) => {
                    // Delivery problems other than duplicates never touch
                    // committed accounting state.
                    warn!(signature = %signature, %error, "notification failed");
                }
            }
        }

        info!(
            signature = %signature,
            trades = entries.len(),
            "signature committed"
        );
        Ok(JobOutcome::Completed)
    }

    /// Payload-first transaction resolution.
    ///
    /// Exhausted attempts and unknown signatures are transient skips (claim
    /// released so a redelivery can retry); rejected requests are permanent.
    async fn resolve_transaction(&self, job: &Job) -> ResolvedTx {
        if let Some(tx) = &job.transaction_data {
            return ResolvedTx::Found(tx.clone());
        }
        match self.chain.fetch_transaction(job.signature.as_str()).await {
            Ok(Some(tx)) => ResolvedTx::Found(tx),
            Ok(None) => {
                warn!(signature = %job.signature, "transaction not found on chain");
                ResolvedTx::Skip(SkipReason::FetchExhausted)
            }
            Err(error) if error.is_transient() => {
                warn!(signature = %job.signature, %error, "transaction fetch exhausted");
                ResolvedTx::Skip(SkipReason::FetchExhausted)
            }
            Err(error) => {
                warn!(signature = %job.signature, %error, "transaction fetch rejected");
                ResolvedTx::Skip(SkipReason::Unrecognized)
            }
        }
    }

    async fn build_entry(
        &self,
        job: &Job,
        intent: &TradeIntent,
        native_price: Option<f64>,
        wallet_balance: Option<f64>,
        now: TimeMs,
    ) -> Result<(Trade, PositionDelta), ProcessError> {
        let wallet = &job.wallet_address;
        let token = &intent.token.token;

        let symbol = match &intent.token.symbol {
            Some(symbol) => symbol.clone(),
            None => match self.resolver.get_token_metadata(token.as_str()).await {
                Ok(metadata) => metadata.symbol,
                Err(error) => {
                    warn!(token = %token, %error, "symbol resolution failed");
                    "Unknown".to_string()
                }
            },
        };

        let (quantity, quantity_usd) = self
            .value_counter_leg(&intent.counter, native_price)
            .await;

        let position = self
            .repo
            .get_position(wallet, token)
            .await
            .map_err(|e| ProcessError::Transient(e.to_string()))?;

        let mut trade = Trade {
            signature: job.signature.clone(),
            wallet_address: wallet.clone(),
            trade_event: intent.event,
            token_address: token.clone(),
            token_symbol: symbol,
            quantity,
            quantity_usd,
            token_amount: intent.token.amount,
            wallet_balance,
            status: TradeStatus::Completed,
            time_ms: now,
            profit: None,
            profit_usd: None,
            cost_basis: None,
            remaining_balance: None,
            entry_price: None,
        };

        let delta = match intent.event {
            TradeEvent::Buy => {
                let outcome = ledger::compute_buy(
                    position.as_ref(),
                    wallet,
                    token,
                    intent.token.amount,
                    quantity_usd,
                )
                .map_err(|e| ProcessError::Ledger(e.to_string()))?;
                outcome.delta
            }
            TradeEvent::Sell => {
                // The balance probe happens before any database write so a
                // probe failure leaves nothing to unwind.
                let tracked = position
                    .as_ref()
                    .map(|p| p.has_buy_history())
                    .unwrap_or(false);
                let chain_balance = if tracked {
                    None
                } else {
                    Some(
                        self.chain
                            .get_token_balance(wallet.as_str(), token.as_str())
                            .await
                            .map_err(|e| ProcessError::Transient(e.to_string()))?,
                    )
                };

                let outcome = ledger::compute_sell(
                    position.as_ref(),
                    wallet,
                    token,
                    intent.token.amount,
                    quantity_usd,
                    native_price,
                    chain_balance,
                )
                .map_err(|e| ProcessError::Ledger(e.to_string()))?;

                trade.profit = Some(outcome.profit_coin);
                trade.profit_usd = Some(outcome.profit_usd);
                trade.cost_basis = Some(outcome.cost_basis);
                trade.remaining_balance = Some(outcome.remaining_after);
                trade.entry_price = Some(outcome.entry_price);
                outcome.delta
            }
        };

        if !trade.is_finite() {
            return Err(ProcessError::Ledger(format!(
                "non-finite trade fields for {}",
                trade.signature
            )));
        }

        Ok((trade, delta))
    }

    /// Value the opposite leg of the swap in native-coin and USD terms.
    ///
    /// Price lookup failures default the conversion rate to 1, logged, never
    /// an error.
    async fn value_counter_leg(&self, counter: &SwapLeg, native_price: Option<f64>) -> (f64, f64) {
        let rate = native_price.unwrap_or(1.0);
        let mint = counter.token.as_str();

        if mint == SOL_MINT {
            return (counter.amount, counter.amount * rate);
        }
        if self.quote_mints.contains(mint) {
            // Stable quote leg: the amount is already the USD value.
            return (counter.amount / rate, counter.amount);
        }

        // Non-quote counter leg (token-to-token rotation).
        let price = match self.resolver.get_token_data(mint).await {
            Ok(data) => data.price_usd,
            Err(error) => {
                warn!(token = mint, %error, "counter leg price lookup failed, using rate 1");
                None
            }
        };
        let usd = counter.amount * price.unwrap_or(1.0);
        (usd / rate, usd)
    }
}

#[async_trait]
impl JobProcessor for SignatureProcessor {
    async fn process(&self, job: &Job) -> Result<JobOutcome, ProcessError> {
        if !self.gate.try_claim(&job.signature).await {
            // Someone else holds the claim; do not release it.
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyClaimed));
        }
        let result = self.process_claimed(job).await;
        self.gate.release(&job.signature).await;
        result
    }
}
