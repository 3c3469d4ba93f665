//! Yahoo Finance market data provider implementation

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::messages::parse_chart;
use crate::models::{HistoryRange, PriceSeries};
use crate::services::cache::ResponseCache;
use crate::services::market_data::{MarketDataProvider, ProviderError};

pub struct YahooMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
    cache: Option<ResponseCache>,
}

impl YahooMarketDataProvider {
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn range_param(range: HistoryRange) -> &'static str {
        match range {
            HistoryRange::Recent => "5d",
            HistoryRange::OneYear => "1y",
            HistoryRange::AllTime => "max",
            HistoryRange::ThirtyDay => "1mo",
        }
    }

    async fn cached(&self, symbol: &str, range: HistoryRange) -> Option<PriceSeries> {
        let body = self.cache.as_ref()?.get(symbol, range).await?;
        match parse_chart(symbol, &body) {
            Ok(series) => {
                debug!(symbol, range = %range, "Yahoo: served from cache");
                Some(series)
            }
            Err(e) => {
                warn!(symbol, range = %range, error = %e, "Yahoo: ignoring unparseable cache entry");
                None
            }
        }
    }

    async fn download(&self, symbol: &str, range: HistoryRange) -> Result<String, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("range", Self::range_param(range)), ("interval", "1d")])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound(symbol.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::Throttled(format!("HTTP 429 for {symbol}")))
            }
            status if !status.is_success() => {
                return Err(ProviderError::Network(format!("HTTP {status} for {symbol}")))
            }
            _ => {}
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketDataProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceSeries, ProviderError> {
        let series = match self.cached(symbol, range).await {
            Some(series) => series,
            None => {
                let body = self.download(symbol, range).await?;
                let series = parse_chart(symbol, &body)?;
                if let Some(cache) = self.cache.as_ref().filter(|_| !series.is_empty()) {
                    if let Err(e) = cache.put(symbol, range, &body).await {
                        warn!(symbol, range = %range, error = %e, "Yahoo: failed to cache response");
                    }
                }
                series
            }
        };

        Ok(match range {
            HistoryRange::Recent => series.tail(HistoryRange::RECENT_BARS),
            _ => series,
        })
    }

    async fn discard(&self, symbol: &str, range: HistoryRange) {
        if let Some(cache) = &self.cache {
            cache.remove(symbol, range).await;
        }
    }
}
