//! Shared data models spanning the fetch pipeline and the API.

pub mod aggregate;
pub mod price;
pub mod ticker;
pub mod tracked;

pub use aggregate::{AggregateResult, FailureReason, Summary, SymbolFailure};
pub use price::{HistoryRange, PriceBar, PriceSeries};
pub use ticker::{FetchedSeries, History, MetricsRecord, HISTORY_POINTS};
pub use tracked::{TrackedSet, TrackedSetError};
