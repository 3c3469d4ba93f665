//! Market data provider interface shared by every upstream source.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{HistoryRange, PriceSeries};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("throttled by provider: {0}")]
    Throttled(String),

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("implausible data: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// One upstream source of daily price history.
///
/// Implementations make a single attempt per call; retry and fallback are the
/// caller's business.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier reported as `data_source`.
    fn name(&self) -> &str;

    /// Daily bars for `symbol` over `range`, oldest first.
    async fn fetch(&self, symbol: &str, range: HistoryRange)
        -> Result<PriceSeries, ProviderError>;

    /// Called when a series returned by `fetch` was rejected, so the next
    /// attempt goes back upstream instead of reusing it.
    async fn discard(&self, _symbol: &str, _range: HistoryRange) {}
}
