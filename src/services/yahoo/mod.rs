//! Yahoo Finance chart API client (primary provider).

pub mod messages;
pub mod provider;

pub use provider::YahooMarketDataProvider;
