//! Scripted in-memory providers shared by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tickerwatch::models::{HistoryRange, PriceBar, PriceSeries};
use tickerwatch::pipeline::{DataValidator, RetryPolicy, SymbolFetcher};
use tickerwatch::services::market_data::{MarketDataProvider, ProviderError};

#[allow(dead_code)]
pub enum MockReply {
    Series(PriceSeries),
    Error(ProviderError),
    Hang,
}

type Script = dyn Fn(&str, HistoryRange, usize) -> MockReply + Send + Sync;

/// Provider whose answers come from a closure receiving the symbol, the range
/// and the 1-based call number for that symbol/range pair.
pub struct MockProvider {
    name: String,
    script: Box<Script>,
    delay: Duration,
    calls: Mutex<HashMap<(String, HistoryRange), usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    discards: AtomicUsize,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new<F>(name: &str, script: F) -> Self
    where
        F: Fn(&str, HistoryRange, usize) -> MockReply + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            discards: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, symbol: &str, range: HistoryRange) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.get(&(symbol.to_string(), range)).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of series the fetcher handed back as rejected.
    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceSeries, ProviderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry((symbol.to_string(), range)).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.script)(symbol, range, call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            MockReply::Series(series) => Ok(series),
            MockReply::Error(e) => Err(e),
            MockReply::Hang => std::future::pending().await,
        }
    }

    async fn discard(&self, _symbol: &str, _range: HistoryRange) {
        self.discards.fetch_add(1, Ordering::SeqCst);
    }
}

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

/// Close-only daily bars starting 2024-01-01.
pub fn closes(values: &[f64]) -> PriceSeries {
    PriceSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, c)| PriceBar::close_only(day(i), *c))
            .collect(),
    )
}

/// Full bars from `(high, low, close)` triples starting 2024-01-01.
#[allow(dead_code)]
pub fn ohlc(values: &[(f64, f64, f64)]) -> PriceSeries {
    PriceSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, (h, l, c))| PriceBar::new(day(i), *h, *l, *c))
            .collect(),
    )
}

/// Well-formed series for a symbol currently trading at `price`:
/// 52-week range is 0.5x..1.5x, all-time 0.25x..2x, previous close `price - 1`.
pub fn healthy_series(price: f64, range: HistoryRange) -> PriceSeries {
    match range {
        HistoryRange::Recent => closes(&[price + 2.0, price]),
        HistoryRange::OneYear => closes(&[price * 0.5, price * 1.5, price]),
        HistoryRange::AllTime => closes(&[price * 0.25, price * 2.0, price]),
        HistoryRange::ThirtyDay => closes(&[price - 1.0, price]),
    }
}

/// Provider that knows the given symbols and reports every other one as not found.
#[allow(dead_code)]
pub fn healthy_provider(name: &str, prices: &[(&str, f64)]) -> MockProvider {
    let prices: HashMap<String, f64> = prices.iter().map(|(s, p)| (s.to_string(), *p)).collect();
    MockProvider::new(name, move |symbol, range, _| match prices.get(symbol) {
        Some(price) => MockReply::Series(healthy_series(*price, range)),
        None => MockReply::Error(ProviderError::NotFound(symbol.to_string())),
    })
}

#[allow(dead_code)]
pub fn failing_provider(name: &str) -> MockProvider {
    MockProvider::new(name, |_, _, _| {
        MockReply::Error(ProviderError::Network("connection refused".to_string()))
    })
}

/// Three attempts, no pause between them.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

#[allow(dead_code)]
pub fn fetcher(providers: Vec<Arc<MockProvider>>) -> SymbolFetcher {
    let providers: Vec<Arc<dyn MarketDataProvider>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn MarketDataProvider>)
        .collect();
    SymbolFetcher::new(providers, DataValidator::default(), fast_retry())
}
