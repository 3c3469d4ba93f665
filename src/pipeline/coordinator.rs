//! Fan-out of symbol fetches over a bounded pool and fan-in of the results.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};

use super::fetcher::SymbolFetcher;
use crate::metrics::Metrics;
use crate::models::{AggregateResult, FailureReason, MetricsRecord, SymbolFailure, TrackedSet};
use crate::services::cache::CacheReset;

pub const DEFAULT_POOL_SIZE: usize = 8;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to dispatch fetch tasks: {0}")]
    Dispatch(String),
}

enum TaskOutcome {
    Success(MetricsRecord),
    Failure(SymbolFailure),
}

pub struct FetchCoordinator {
    fetcher: Arc<SymbolFetcher>,
    pool_size: usize,
    task_timeout: Duration,
    cache_dirs: Vec<PathBuf>,
    cache_guard: Mutex<()>,
    metrics: Option<Arc<Metrics>>,
}

impl FetchCoordinator {
    pub fn new(fetcher: Arc<SymbolFetcher>) -> Self {
        Self {
            fetcher,
            pool_size: DEFAULT_POOL_SIZE,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            cache_dirs: Vec::new(),
            cache_guard: Mutex::new(()),
            metrics: None,
        }
    }

    /// Maximum number of symbols fetched at once.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    /// Directory cleared before every cycle.
    pub fn with_cache_reset(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dirs.push(dir.into());
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Runs one full cycle over `tracked`. Every tracked symbol ends up in
    /// exactly one of the success or failure lists. A dispatch failure marks
    /// every symbol failed and sets the top-level `error`.
    pub async fn run_cycle(&self, tracked: &TrackedSet) -> AggregateResult {
        let start = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.fetch_cycles_total.inc();
        }

        // Cycles sharing a cache run one at a time so a reset never lands
        // while another cycle is reading or writing entries.
        let _cache_guard = if self.cache_dirs.is_empty() {
            None
        } else {
            Some(self.cache_guard.lock().await)
        };
        self.reset_caches().await;

        let result = match self.dispatch(tracked).await {
            Ok((successes, failures)) => AggregateResult::build(successes, failures, Utc::now()),
            Err(e) => {
                error!(error = %e, symbols = tracked.len(), "FetchCoordinator: cycle failed");
                if let Some(metrics) = &self.metrics {
                    metrics.fetch_cycle_failures_total.inc();
                }
                AggregateResult::cycle_failure(tracked.symbols(), e.to_string(), Utc::now())
            }
        };

        let elapsed = start.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics
                .symbol_fetch_failures_total
                .inc_by(result.summary.failed as u64);
            metrics
                .fetch_cycle_duration_seconds
                .observe(elapsed.as_secs_f64());
        }

        info!(
            total = result.summary.total_tickers,
            successful = result.summary.successful,
            failed = result.summary.failed,
            alerts = result.summary.alerts_triggered.len(),
            duration_ms = elapsed.as_millis() as u64,
            "FetchCoordinator: cycle complete"
        );
        result
    }

    async fn reset_caches(&self) {
        for dir in &self.cache_dirs {
            if let Err(e) = CacheReset::reset(dir).await {
                warn!(error = %e, "FetchCoordinator: cache reset failed, continuing");
            }
        }
    }

    async fn dispatch(
        &self,
        tracked: &TrackedSet,
    ) -> Result<(Vec<MetricsRecord>, Vec<SymbolFailure>), CycleError> {
        if self.pool_size == 0 || self.pool_size > Semaphore::MAX_PERMITS {
            return Err(CycleError::Dispatch(format!(
                "invalid worker pool size {}",
                self.pool_size
            )));
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| CycleError::Dispatch(e.to_string()))?;

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let mut pending: FuturesUnordered<_> = tracked
            .iter()
            .map(|(symbol, target)| self.run_task(semaphore.clone(), symbol.to_string(), target))
            .collect();

        let mut successes = Vec::with_capacity(tracked.len());
        let mut failures = Vec::new();
        while let Some(outcome) = pending.next().await {
            match outcome? {
                TaskOutcome::Success(record) => successes.push(record),
                TaskOutcome::Failure(failure) => failures.push(failure),
            }
        }
        Ok((successes, failures))
    }

    /// Waits for a pool slot, then runs the fetch on its own task. The slot is
    /// held by the spawned task and released when it finishes or is aborted
    /// after the timeout.
    async fn run_task(
        &self,
        semaphore: Arc<Semaphore>,
        symbol: String,
        target: f64,
    ) -> Result<TaskOutcome, CycleError> {
        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|e| CycleError::Dispatch(e.to_string()))?;

        let fetcher = self.fetcher.clone();
        let task_symbol = symbol.clone();
        let mut handle = tokio::spawn(async move {
            let _permit = permit;
            fetcher.fetch_one(&task_symbol, target).await
        });

        let reason = match tokio::time::timeout(self.task_timeout, &mut handle).await {
            Ok(Ok(Some(record))) => return Ok(TaskOutcome::Success(record)),
            Ok(Ok(None)) => FailureReason::NoData,
            Ok(Err(e)) => {
                error!(symbol = %symbol, error = %e, "FetchCoordinator: fetch task failed");
                FailureReason::TaskFailed
            }
            Err(_) => {
                handle.abort();
                warn!(
                    symbol = %symbol,
                    timeout_secs = self.task_timeout.as_secs_f64(),
                    "FetchCoordinator: fetch timed out, task aborted"
                );
                FailureReason::Timeout
            }
        };

        Ok(TaskOutcome::Failure(SymbolFailure {
            ticker: symbol,
            reason,
        }))
    }
}
