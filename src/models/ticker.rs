use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::price::PriceSeries;

/// Number of closes kept in the short-term history.
pub const HISTORY_POINTS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

/// Series gathered for one symbol in one cycle. Only `recent` is mandatory;
/// a missing optional range leaves the fields derived from it empty.
#[derive(Debug, Clone, Default)]
pub struct FetchedSeries {
    pub recent: PriceSeries,
    pub one_year: Option<PriceSeries>,
    pub all_time: Option<PriceSeries>,
    pub thirty_day: Option<PriceSeries>,
}

/// Per-symbol snapshot produced by one fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub ticker: String,
    pub current_price: f64,
    pub week52_low: Option<f64>,
    pub week52_high: Option<f64>,
    pub all_time_low: Option<f64>,
    pub all_time_high: Option<f64>,
    pub target_price: f64,
    pub price_change_24h: Option<f64>,
    pub price_change_pct_24h: Option<f64>,
    pub distance_from_52w_high: Option<f64>,
    pub distance_from_52w_low: Option<f64>,
    /// `(target - current) / target * 100`; negative while above target.
    pub distance_from_target: Option<f64>,
    pub alert_triggered: bool,
    pub history: Option<History>,
    pub last_updated: DateTime<Utc>,
    pub data_source: String,
}

impl MetricsRecord {
    /// Derives the record from the fetched series. Returns `None` when the
    /// recent series has no close to use as the current price.
    pub fn derive(
        ticker: &str,
        target_price: f64,
        data_source: &str,
        series: &FetchedSeries,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let current = series.recent.last_close()?;

        let week52_high = series.one_year.as_ref().and_then(PriceSeries::highest);
        let week52_low = series.one_year.as_ref().and_then(PriceSeries::lowest);
        let all_time_high = series.all_time.as_ref().and_then(PriceSeries::highest);
        let all_time_low = series.all_time.as_ref().and_then(PriceSeries::lowest);

        let previous = series
            .thirty_day
            .as_ref()
            .and_then(PriceSeries::previous_close);
        let price_change_24h = previous.map(|prev| current - prev);
        let price_change_pct_24h = previous
            .filter(|prev| *prev != 0.0)
            .map(|prev| (current - prev) / prev * 100.0);

        let history = series.thirty_day.as_ref().map(|s| {
            let recent = s.clone().tail(HISTORY_POINTS);
            History {
                dates: recent
                    .bars()
                    .iter()
                    .map(|b| b.date.format("%Y-%m-%d").to_string())
                    .collect(),
                prices: recent.bars().iter().map(|b| b.close).collect(),
            }
        });

        Some(Self {
            ticker: ticker.to_string(),
            current_price: current,
            week52_low,
            week52_high,
            all_time_low,
            all_time_high,
            target_price,
            price_change_24h,
            price_change_pct_24h,
            distance_from_52w_high: week52_high.and_then(|b| percent_distance(current, b)),
            distance_from_52w_low: week52_low.and_then(|b| percent_distance(current, b)),
            distance_from_target: percent_distance(current, target_price).map(|d| -d),
            alert_triggered: current <= target_price,
            history,
            last_updated: timestamp,
            data_source: data_source.to_string(),
        })
    }
}

/// `(current - bound) / bound * 100`, undefined for a zero bound.
pub fn percent_distance(current: f64, bound: f64) -> Option<f64> {
    if bound == 0.0 {
        return None;
    }
    Some((current - bound) / bound * 100.0)
}
