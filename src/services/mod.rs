//! Outbound integrations: market data providers, response cache, notifications.

pub mod cache;
pub mod market_data;
pub mod notification;
pub mod stooq;
pub mod yahoo;

pub use cache::{CacheError, CacheReset, ResponseCache};
pub use market_data::{MarketDataProvider, ProviderError};
pub use notification::{alert_message, LogNotifier, Notifier, NotifyError, PushbulletNotifier};
pub use stooq::StooqMarketDataProvider;
pub use yahoo::YahooMarketDataProvider;
