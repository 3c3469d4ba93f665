//! Wiring from configuration to a ready-to-run fetch coordinator

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::core::scheduler::{CycleScheduler, SchedulerError};
use crate::metrics::Metrics;
use crate::models::TrackedSet;
use crate::pipeline::{DataValidator, FetchCoordinator, RetryPolicy, SymbolFetcher};
use crate::services::market_data::MarketDataProvider;
use crate::services::notification::{LogNotifier, Notifier, PushbulletNotifier};
use crate::services::{ResponseCache, StooqMarketDataProvider, YahooMarketDataProvider};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) tickerwatch/0.1";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to initialize metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Everything both binaries share: the tracked set, the coordinator and the
/// metrics registry it reports into.
pub struct Runtime {
    pub config: AppConfig,
    pub tracked: Arc<TrackedSet>,
    pub coordinator: Arc<FetchCoordinator>,
    pub metrics: Arc<Metrics>,
    pub http_client: reqwest::Client,
}

impl Runtime {
    pub fn from_config(config: AppConfig) -> Result<Self, RuntimeError> {
        let metrics = Arc::new(Metrics::new()?);
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.provider_timeout)
            .build()?;

        let yahoo_cache = ResponseCache::new(config.cache_dir.join("yahoo"), config.cache_ttl);
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            Arc::new(
                YahooMarketDataProvider::with_client(&config.yahoo_base_url, http_client.clone())
                    .with_cache(yahoo_cache),
            ),
            Arc::new(StooqMarketDataProvider::with_client(
                &config.stooq_base_url,
                http_client.clone(),
            )),
        ];

        let fetcher = SymbolFetcher::new(
            providers,
            DataValidator::new(config.price_ceiling),
            RetryPolicy::new(config.retry_max_attempts, config.retry_backoff),
        )
        .with_metrics(metrics.clone());

        let mut coordinator = FetchCoordinator::new(Arc::new(fetcher))
            .with_pool_size(config.pool_size)
            .with_task_timeout(config.task_timeout)
            .with_metrics(metrics.clone());
        if config.reset_cache_each_cycle {
            coordinator = coordinator.with_cache_reset(config.cache_dir.clone());
        }

        info!(
            symbols = config.tracked.len(),
            pool_size = config.pool_size,
            task_timeout_secs = config.task_timeout.as_secs(),
            retry_attempts = config.retry_max_attempts,
            "Runtime: fetch pipeline ready"
        );

        Ok(Self {
            tracked: Arc::new(config.tracked.clone()),
            coordinator: Arc::new(coordinator),
            metrics,
            http_client,
            config,
        })
    }

    /// Pushbullet when a token is configured, the log otherwise.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match &self.config.pushbullet_token {
            Some(token) => Arc::new(PushbulletNotifier::new(self.http_client.clone(), token)),
            None => Arc::new(LogNotifier),
        }
    }

    pub fn scheduler(&self) -> Result<CycleScheduler, SchedulerError> {
        CycleScheduler::new(
            self.coordinator.clone(),
            self.tracked.clone(),
            self.notifier(),
            &self.config.fetch_schedule,
        )
    }
}
