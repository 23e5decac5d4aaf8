//! The polling loop: price → sync → allowances → act → claim → sleep.
//!
//! Errors inside an iteration never escape `run`. Transient ones are retried
//! up to `error_retries` times; the rest, and transient ones that outlast the
//! retries, are logged and recorded in the `RunReport`. A reverted transaction
//! or a broken correlation is left for the next iteration to re-evaluate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tracing::{debug, error, info, warn};

use sentinel_common::SentinelError;
use sentinel_events::EventCache;

use crate::allowance::{AllowanceManager, AllowanceTarget};
use crate::engine::{DecisionEngine, MarketView};
use crate::price_feed::PriceFeed;
use crate::types::{IterationFailure, LoopState, RunMode, RunReport, Step};

pub struct ActionLoop {
    cache: EventCache,
    allowances: AllowanceManager,
    targets: Vec<AllowanceTarget>,
    price_feed: Box<dyn PriceFeed>,
    engine: Box<dyn DecisionEngine>,
    account: Address,
    polling_delay: Duration,
    error_retries: u32,
    error_retries_timeout: Duration,
    stop: Arc<AtomicBool>,
    state: LoopState,
}

impl ActionLoop {
    /// A single-shot loop with no allowance targets and no retries.
    pub fn new(
        cache: EventCache,
        allowances: AllowanceManager,
        price_feed: Box<dyn PriceFeed>,
        engine: Box<dyn DecisionEngine>,
        account: Address,
    ) -> Self {
        Self {
            cache,
            allowances,
            targets: Vec::new(),
            price_feed,
            engine,
            account,
            polling_delay: Duration::ZERO,
            error_retries: 0,
            error_retries_timeout: Duration::ZERO,
            stop: Arc::new(AtomicBool::new(false)),
            state: LoopState::Initializing,
        }
    }

    pub fn with_targets(mut self, targets: Vec<AllowanceTarget>) -> Self {
        self.targets = targets;
        self
    }

    /// Delay between iterations. Zero selects single-shot mode.
    pub fn with_polling_delay(mut self, delay: Duration) -> Self {
        self.polling_delay = delay;
        self
    }

    /// Re-run an iteration that failed on a retryable error up to `retries`
    /// more times, waiting `timeout · 2^attempt` before each retry.
    pub fn with_retries(mut self, retries: u32, timeout: Duration) -> Self {
        self.error_retries = retries;
        self.error_retries_timeout = timeout;
        self
    }

    /// Share an externally owned stop flag.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Raising this flag ends continuous mode after the current sleep.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn mode(&self) -> RunMode {
        if self.polling_delay.is_zero() {
            RunMode::SingleShot
        } else {
            RunMode::Continuous
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    pub fn targets(&self) -> &[AllowanceTarget] {
        &self.targets
    }

    /// Run until single-shot completion or until stopped. Never fails; iteration
    /// errors are logged and collected in the report.
    pub async fn run(&mut self) -> RunReport {
        let mut report = RunReport::default();
        if self.state == LoopState::Stopped {
            warn!("Action loop already stopped");
            return report;
        }

        let mode = self.mode();
        self.state = LoopState::Looping;
        info!(
            contract = %self.cache.contract_address(),
            account = %self.account,
            ?mode,
            polling_delay_ms = self.polling_delay.as_millis() as u64,
            "Action loop started"
        );

        loop {
            report.iterations += 1;
            let iteration = report.iterations;

            match self.run_iteration(iteration).await {
                Ok(()) => debug!(iteration, cursor = self.cache.cursor(), "Iteration complete"),
                Err(failure) => {
                    error!(
                        iteration,
                        step = %failure.step,
                        contract = %self.cache.contract_address(),
                        error = failure.message.as_str(),
                        "Iteration failed"
                    );
                    report.failures.push(failure);
                }
            }

            if mode == RunMode::SingleShot {
                break;
            }

            tokio::time::sleep(self.polling_delay).await;

            if self.stop.load(Ordering::SeqCst) {
                info!(iteration, "Stop requested");
                break;
            }
        }

        self.state = LoopState::Stopped;
        info!("Action loop stopped. {report}");
        report
    }

    async fn run_iteration(&mut self, iteration: u64) -> Result<(), IterationFailure> {
        let mut attempt: u32 = 0;
        loop {
            match self.run_steps().await {
                Ok(()) => return Ok(()),
                Err((step, e)) if e.is_retryable() && attempt < self.error_retries => {
                    let wait = backoff(self.error_retries_timeout, attempt);
                    warn!(
                        iteration,
                        attempt = attempt + 1,
                        retries = self.error_retries,
                        %step,
                        error = %e,
                        wait_ms = wait.as_millis() as u64,
                        "Iteration step failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err((step, e)) => {
                    return Err(IterationFailure {
                        iteration,
                        step,
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    async fn run_steps(&mut self) -> Result<(), (Step, SentinelError)> {
        self.price_feed
            .update()
            .await
            .map_err(|e| (Step::UpdatePrice, e.into()))?;

        self.cache
            .synchronize()
            .await
            .map_err(|e| (Step::Synchronize, e))?;

        self.allowances
            .ensure_all(&self.targets)
            .await
            .map_err(|e| (Step::EnsureAllowances, e))?;

        let view = MarketView {
            events: &self.cache,
            price: self.price_feed.current_price(),
            account: self.account,
        };
        if view.price.is_none() {
            debug!("Price feed has no price");
        }

        self.engine
            .evaluate_and_act(&view)
            .await
            .map_err(|e| (Step::EvaluateAndAct, e.into()))?;
        self.engine
            .claim_rewards(&view)
            .await
            .map_err(|e| (Step::ClaimRewards, e.into()))?;

        Ok(())
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
}
