//! Per-symbol fetch: provider fallback, retry, validation and derivation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::retry::RetryPolicy;
use super::validator::DataValidator;
use crate::metrics::Metrics;
use crate::models::{FetchedSeries, HistoryRange, MetricsRecord, PriceSeries};
use crate::services::market_data::{MarketDataProvider, ProviderError};

pub struct SymbolFetcher {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    validator: DataValidator,
    retry: RetryPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl SymbolFetcher {
    /// `providers` is the fallback order; the first entry is the primary.
    pub fn new(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        validator: DataValidator,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            providers,
            validator,
            retry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fetches every range for `symbol` and derives its metrics.
    ///
    /// Returns `None` only when no provider yields a usable recent series.
    /// Failures on the other ranges leave the matching fields empty.
    pub async fn fetch_one(&self, symbol: &str, target_price: f64) -> Option<MetricsRecord> {
        let mut exhausted = vec![false; self.providers.len()];

        let Some((recent, source)) = self
            .fetch_range(symbol, HistoryRange::Recent, &mut exhausted)
            .await
        else {
            warn!(symbol, "SymbolFetcher: no provider returned recent data");
            return None;
        };

        let mut series = FetchedSeries {
            recent,
            ..FetchedSeries::default()
        };
        for range in &HistoryRange::ALL[1..] {
            let fetched = self
                .fetch_range(symbol, *range, &mut exhausted)
                .await
                .map(|(s, _)| s);
            if fetched.is_none() {
                debug!(symbol, range = %range, "SymbolFetcher: range unavailable, leaving fields empty");
            }
            match range {
                HistoryRange::OneYear => series.one_year = fetched,
                HistoryRange::AllTime => series.all_time = fetched,
                HistoryRange::ThirtyDay => series.thirty_day = fetched,
                HistoryRange::Recent => {}
            }
        }

        let record = MetricsRecord::derive(symbol, target_price, source, &series, Utc::now())?;
        if record.alert_triggered {
            info!(
                symbol,
                current = record.current_price,
                target = target_price,
                "ALERT: {} is at {} (<= target {})",
                symbol,
                record.current_price,
                target_price
            );
        }
        Some(record)
    }

    /// Walks the provider list for one range. A provider that exhausts its
    /// retries is marked in `exhausted` and skipped for the rest of the symbol.
    async fn fetch_range(
        &self,
        symbol: &str,
        range: HistoryRange,
        exhausted: &mut [bool],
    ) -> Option<(PriceSeries, &str)> {
        for (idx, provider) in self.providers.iter().enumerate() {
            if exhausted[idx] {
                continue;
            }

            let validator = &self.validator;
            let attempt = move || async move {
                let series = provider.fetch(symbol, range).await?;
                if let Err(e) = validator.check(&series, symbol) {
                    provider.discard(symbol, range).await;
                    return Err(e);
                }
                Ok::<_, ProviderError>(series)
            };

            let span = info_span!("fetch", symbol, provider = provider.name(), range = %range);
            match self.retry.run(attempt).instrument(span).await {
                Ok(series) => return Some((series, provider.name())),
                Err(e) => {
                    warn!(
                        symbol,
                        provider = provider.name(),
                        range = %range,
                        error = %e,
                        "SymbolFetcher: provider gave up after {} attempts",
                        self.retry.max_attempts()
                    );
                    exhausted[idx] = true;
                    if idx + 1 < self.providers.len() {
                        if let Some(metrics) = &self.metrics {
                            metrics.provider_fallbacks_total.inc();
                        }
                    }
                }
            }
        }
        None
    }
}
