use crate::models::PriceSeries;
use crate::services::market_data::ProviderError;

pub const DEFAULT_PRICE_CEILING: f64 = 10_000_000.0;

/// Plausibility check applied to every series before it is used.
#[derive(Debug, Clone, Copy)]
pub struct DataValidator {
    ceiling: f64,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_CEILING)
    }
}

impl DataValidator {
    pub fn new(ceiling: f64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn validate(&self, series: &PriceSeries, symbol: &str) -> bool {
        self.check(series, symbol).is_ok()
    }

    /// Rejects empty series, non-finite values, values at or below zero and
    /// values above the ceiling (usually a unit or decimal shift upstream).
    pub fn check(&self, series: &PriceSeries, symbol: &str) -> Result<(), ProviderError> {
        if series.is_empty() {
            return Err(ProviderError::Validation(format!("{symbol}: empty series")));
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in series.bars().iter().flat_map(|b| b.values()) {
            if !value.is_finite() {
                return Err(ProviderError::Validation(format!(
                    "{symbol}: non-finite price {value}"
                )));
            }
            min = min.min(value);
            max = max.max(value);
        }

        if min <= 0.0 {
            return Err(ProviderError::Validation(format!(
                "{symbol}: non-positive price {min}"
            )));
        }
        if max > self.ceiling {
            return Err(ProviderError::Validation(format!(
                "{symbol}: price {max} above ceiling {}",
                self.ceiling
            )));
        }
        Ok(())
    }
}
