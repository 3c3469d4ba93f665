//! Tickerwatch: periodic price snapshots for a tracked set of symbols.
//!
//! A fetch cycle fans out over the tracked symbols, queries the upstream
//! market-data providers with retry and fallback, derives per-symbol metrics
//! and aggregates everything into one response served over HTTP.

pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;
