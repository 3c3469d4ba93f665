use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ticker::MetricsRecord;

/// Why a symbol ended up in `failed_tickers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Every provider failed for the recent range.
    NoData,
    /// The per-task timeout elapsed.
    Timeout,
    /// The fetch task panicked or was aborted.
    TaskFailed,
    /// The cycle could not dispatch any work.
    DispatchFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::NoData => "no_data",
            FailureReason::Timeout => "timeout",
            FailureReason::TaskFailed => "task_failed",
            FailureReason::DispatchFailed => "dispatch_failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub ticker: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tickers: usize,
    pub successful: usize,
    pub failed: usize,
    pub failed_tickers: Vec<String>,
    pub failures: Vec<SymbolFailure>,
    pub alerts_triggered: Vec<MetricsRecord>,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of one fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub tickers: Vec<MetricsRecord>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl AggregateResult {
    /// Assembles the cycle result. Successes and failures are sorted by
    /// symbol so output does not depend on completion order.
    pub fn build(
        mut successes: Vec<MetricsRecord>,
        mut failures: Vec<SymbolFailure>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        successes.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        failures.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let alerts_triggered = successes
            .iter()
            .filter(|r| r.alert_triggered)
            .cloned()
            .collect();

        let summary = Summary {
            total_tickers: successes.len() + failures.len(),
            successful: successes.len(),
            failed: failures.len(),
            failed_tickers: failures.iter().map(|f| f.ticker.clone()).collect(),
            failures,
            alerts_triggered,
            last_updated: timestamp,
        };

        Self {
            tickers: successes,
            summary,
            error: None,
        }
    }

    /// Result for a cycle that never dispatched: every symbol failed and the
    /// cause is attached at the top level.
    pub fn cycle_failure<'a, I>(symbols: I, error: String, timestamp: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let failures = symbols
            .into_iter()
            .map(|s| SymbolFailure {
                ticker: s.to_string(),
                reason: FailureReason::DispatchFailed,
            })
            .collect();
        let mut result = Self::build(Vec::new(), failures, timestamp);
        result.error = Some(error);
        result
    }

    pub fn is_cycle_failure(&self) -> bool {
        self.error.is_some()
    }
}
