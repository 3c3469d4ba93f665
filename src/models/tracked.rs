use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrackedSetError {
    #[error("tracked symbol must not be empty")]
    EmptySymbol,

    #[error("symbol {0} is listed more than once")]
    DuplicateSymbol(String),

    #[error("target price for {symbol} must be a positive number, got {target}")]
    InvalidTarget { symbol: String, target: f64 },
}

/// Symbols to watch and the target price that triggers an alert for each.
///
/// Iteration order is lexicographic by symbol. The set is fixed once built;
/// fetch cycles only ever read it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedSet {
    targets: BTreeMap<String, f64>,
}

impl TrackedSet {
    pub fn new<I, S>(entries: I) -> Result<Self, TrackedSetError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut targets = BTreeMap::new();
        for (symbol, target) in entries {
            let symbol = symbol.into().trim().to_string();
            if symbol.is_empty() {
                return Err(TrackedSetError::EmptySymbol);
            }
            if !target.is_finite() || target <= 0.0 {
                return Err(TrackedSetError::InvalidTarget { symbol, target });
            }
            if targets.contains_key(&symbol) {
                return Err(TrackedSetError::DuplicateSymbol(symbol));
            }
            targets.insert(symbol, target);
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, symbol: &str) -> Option<f64> {
        self.targets.get(symbol).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.targets.iter().map(|(s, t)| (s.as_str(), *t))
    }
}
