//! The fetch pipeline: validation, retry, per-symbol fetch and the cycle
//! coordinator.

pub mod coordinator;
pub mod fetcher;
pub mod retry;
pub mod validator;

pub use coordinator::{CycleError, FetchCoordinator};
pub use fetcher::SymbolFetcher;
pub use retry::RetryPolicy;
pub use validator::DataValidator;
