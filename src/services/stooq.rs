//! Stooq daily CSV provider (fallback).
//!
//! `GET {base}/q/d/l/?s={symbol}&i=d&d1=YYYYMMDD&d2=YYYYMMDD` returns
//! `Date,Open,High,Low,Close,Volume` rows, oldest first.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::{HistoryRange, PriceBar, PriceSeries};
use crate::services::market_data::{MarketDataProvider, ProviderError};

#[derive(Debug, Deserialize)]
struct StooqRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "High", default)]
    high: Option<f64>,
    #[serde(rename = "Low", default)]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: f64,
}

pub struct StooqMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl StooqMarketDataProvider {
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Stooq symbols are lowercase with an exchange suffix; US listings use
    /// `.us` and USD crypto pairs drop the dash (`BTC-USD` -> `btcusd`).
    pub fn stooq_symbol(symbol: &str) -> String {
        let lower = symbol.to_ascii_lowercase();
        if let Some(base) = lower.strip_suffix("-usd") {
            return format!("{base}usd");
        }
        if lower.contains('.') {
            lower
        } else {
            format!("{lower}.us")
        }
    }

    fn query(symbol: &str, range: HistoryRange, today: NaiveDate) -> Vec<(&'static str, String)> {
        let mut query = vec![("s", Self::stooq_symbol(symbol)), ("i", "d".to_string())];
        if let Some(days) = range.lookback_days() {
            let start = today - Duration::days(days);
            query.push(("d1", start.format("%Y%m%d").to_string()));
            query.push(("d2", today.format("%Y%m%d").to_string()));
        }
        query
    }
}

/// Decodes a Stooq CSV body.
pub fn parse_csv(symbol: &str, body: &str) -> Result<PriceSeries, ProviderError> {
    let trimmed = body.trim();
    if trimmed.eq_ignore_ascii_case("no data") || trimmed.is_empty() {
        return Err(ProviderError::NotFound(symbol.to_string()));
    }
    if trimmed.to_ascii_lowercase().contains("exceeded the daily hits limit") {
        return Err(ProviderError::Throttled(trimmed.to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(trimmed.as_bytes());

    let mut bars = Vec::new();
    for row in reader.deserialize::<StooqRow>() {
        let row = row.map_err(|e| ProviderError::Malformed(format!("{symbol}: {e}")))?;
        bars.push(PriceBar {
            date: row.date,
            high: row.high,
            low: row.low,
            close: row.close,
        });
    }
    Ok(PriceSeries::new(bars))
}

#[async_trait]
impl MarketDataProvider for StooqMarketDataProvider {
    fn name(&self) -> &str {
        "stooq"
    }

    async fn fetch(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceSeries, ProviderError> {
        let url = format!("{}/q/d/l/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&Self::query(symbol, range, Utc::now().date_naive()))
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

        let body = response.text().await?;
        let series = parse_csv(symbol, &body)?;
        Ok(match range {
            HistoryRange::Recent => series.tail(HistoryRange::RECENT_BARS),
            _ => series,
        })
    }
}
