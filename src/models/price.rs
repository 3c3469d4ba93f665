use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window of history requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRange {
    /// The last few daily bars; the current price comes from here.
    Recent,
    OneYear,
    AllTime,
    ThirtyDay,
}

impl HistoryRange {
    /// Order in which a symbol's ranges are fetched. `Recent` goes first so a
    /// symbol with no current price fails before the heavier ranges are requested.
    pub const ALL: [HistoryRange; 4] = [
        HistoryRange::Recent,
        HistoryRange::OneYear,
        HistoryRange::AllTime,
        HistoryRange::ThirtyDay,
    ];

    /// Number of bars `Recent` is trimmed to.
    pub const RECENT_BARS: usize = 5;

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::Recent => "recent",
            HistoryRange::OneYear => "1y",
            HistoryRange::AllTime => "max",
            HistoryRange::ThirtyDay => "30d",
        }
    }

    /// Calendar days covered by the range, `None` for all available history.
    pub fn lookback_days(&self) -> Option<i64> {
        match self {
            HistoryRange::Recent => Some(10),
            HistoryRange::OneYear => Some(365),
            HistoryRange::AllTime => None,
            HistoryRange::ThirtyDay => Some(30),
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One daily observation. Providers that only publish closes leave `high`
/// and `low` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub low: Option<f64>,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            high: Some(high),
            low: Some(low),
            close,
        }
    }

    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            high: None,
            low: None,
            close,
        }
    }

    /// Highest value of the bar, falling back to the close.
    pub fn upper(&self) -> f64 {
        self.high.unwrap_or(self.close)
    }

    /// Lowest value of the bar, falling back to the close.
    pub fn lower(&self) -> f64 {
        self.low.unwrap_or(self.close)
    }

    /// Every price the bar carries.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.high
            .into_iter()
            .chain(self.low)
            .chain(std::iter::once(self.close))
    }
}

/// Chronological bars for one symbol over one range. Empty means no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series, sorting bars by date.
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Close of the bar before the latest one.
    pub fn previous_close(&self) -> Option<f64> {
        let n = self.bars.len();
        if n < 2 {
            return None;
        }
        Some(self.bars[n - 2].close)
    }

    pub fn highest(&self) -> Option<f64> {
        self.bars.iter().map(PriceBar::upper).reduce(f64::max)
    }

    pub fn lowest(&self) -> Option<f64> {
        self.bars.iter().map(PriceBar::lower).reduce(f64::min)
    }

    /// Keeps only the newest `n` bars.
    pub fn tail(mut self, n: usize) -> Self {
        if self.bars.len() > n {
            self.bars.drain(..self.bars.len() - n);
        }
        self
    }
}
