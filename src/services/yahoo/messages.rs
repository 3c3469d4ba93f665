//! Yahoo Finance v8 chart API payloads.

use chrono::DateTime;
use serde::Deserialize;

use crate::models::{PriceBar, PriceSeries};
use crate::services::market_data::ProviderError;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartResult,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteData {
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// Decodes a chart body into a series. Bars without a close (holidays,
/// halted sessions) are dropped; a result with no bars is an empty series.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("{symbol}: {e}")))?;

    if let Some(err) = response.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("Not Found") {
            ProviderError::NotFound(symbol.to_string())
        } else {
            ProviderError::Malformed(format!("{}: {}", err.code, err.description))
        });
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::Malformed(format!("{symbol}: empty chart result")))?;

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| ProviderError::Malformed(format!("invalid timestamp: {ts}")))?
            .date_naive();
        bars.push(PriceBar {
            date,
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close,
        });
    }

    Ok(PriceSeries::new(bars))
}
