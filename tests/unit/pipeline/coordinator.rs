//! Unit tests for the fetch coordinator

use std::sync::Arc;
use std::time::{Duration, Instant};

use tickerwatch::metrics::Metrics;
use tickerwatch::models::{AggregateResult, FailureReason, HistoryRange, TrackedSet};
use tickerwatch::pipeline::FetchCoordinator;

use crate::support::{
    closes, fetcher, healthy_provider, healthy_series, MockProvider, MockReply,
};

fn coordinator(providers: Vec<Arc<MockProvider>>) -> FetchCoordinator {
    FetchCoordinator::new(Arc::new(fetcher(providers)))
}

fn tracked(entries: &[(&str, f64)]) -> TrackedSet {
    TrackedSet::new(entries.iter().copied()).unwrap()
}

/// Result with the wall-clock fields blanked so two cycles can be compared.
fn without_timestamps(mut result: AggregateResult) -> serde_json::Value {
    let epoch = chrono::DateTime::from_timestamp(0, 0).unwrap();
    result.summary.last_updated = epoch;
    for record in result
        .tickers
        .iter_mut()
        .chain(result.summary.alerts_triggered.iter_mut())
    {
        record.last_updated = epoch;
    }
    serde_json::to_value(result).unwrap()
}

#[tokio::test]
async fn test_alerts_only_for_symbols_at_or_below_target() {
    let provider = Arc::new(healthy_provider("yahoo", &[("AAA", 90.0), ("BBB", 60.0)]));
    let coordinator = coordinator(vec![provider]);

    let result = coordinator
        .run_cycle(&tracked(&[("AAA", 100.0), ("BBB", 50.0)]))
        .await;

    assert!(result.error.is_none());
    assert_eq!(result.summary.successful, 2);
    assert_eq!(result.summary.failed, 0);
    assert_eq!(result.summary.total_tickers, 2);
    assert_eq!(result.summary.alerts_triggered.len(), 1);
    assert_eq!(result.summary.alerts_triggered[0].ticker, "AAA");
    assert_eq!(result.summary.alerts_triggered[0].current_price, 90.0);

    let bbb = result.tickers.iter().find(|r| r.ticker == "BBB").unwrap();
    assert!(!bbb.alert_triggered);
}

#[tokio::test]
async fn test_every_symbol_lands_in_exactly_one_bucket() {
    let provider = Arc::new(healthy_provider("yahoo", &[("AAA", 10.0), ("CCC", 30.0)]));
    let coordinator = coordinator(vec![provider]);

    let result = coordinator
        .run_cycle(&tracked(&[("CCC", 1.0), ("ZZZ", 1.0), ("AAA", 1.0)]))
        .await;

    let tickers: Vec<&str> = result.tickers.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["AAA", "CCC"]);
    assert_eq!(result.summary.failed_tickers, vec!["ZZZ"]);
    assert_eq!(result.summary.failures[0].reason, FailureReason::NoData);
    assert_eq!(
        result.summary.successful + result.summary.failed,
        result.summary.total_tickers
    );
    assert_eq!(result.summary.total_tickers, 3);
}

#[tokio::test]
async fn test_slow_symbol_times_out_without_blocking_others() {
    let provider = Arc::new(MockProvider::new("yahoo", |symbol, range, _| {
        if symbol == "SLOW" {
            MockReply::Hang
        } else {
            MockReply::Series(healthy_series(10.0, range))
        }
    }));
    let coordinator =
        coordinator(vec![provider]).with_task_timeout(Duration::from_millis(200));

    let start = Instant::now();
    let result = coordinator
        .run_cycle(&tracked(&[("FAST", 5.0), ("SLOW", 5.0)]))
        .await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(result.summary.successful, 1);
    assert_eq!(result.tickers[0].ticker, "FAST");
    assert_eq!(result.summary.failed_tickers, vec!["SLOW"]);
    assert_eq!(result.summary.failures[0].reason, FailureReason::Timeout);
}

#[tokio::test]
async fn test_hung_symbol_releases_its_pool_slot() {
    let provider = Arc::new(MockProvider::new("yahoo", |symbol, range, _| {
        if symbol == "AAA" {
            MockReply::Hang
        } else {
            MockReply::Series(healthy_series(10.0, range))
        }
    }));
    let coordinator = coordinator(vec![provider])
        .with_pool_size(1)
        .with_task_timeout(Duration::from_millis(200));

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        coordinator.run_cycle(&tracked(&[("AAA", 5.0), ("BBB", 5.0), ("CCC", 5.0)])),
    )
    .await
    .expect("cycle finishes while AAA never answers");

    let tickers: Vec<&str> = result.tickers.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["BBB", "CCC"]);
    assert_eq!(result.summary.failed_tickers, vec!["AAA"]);
    assert_eq!(result.summary.failures[0].reason, FailureReason::Timeout);
}

#[tokio::test]
async fn test_invalid_one_year_range_only_blanks_week52_fields() {
    let provider = Arc::new(MockProvider::new("yahoo", |_, range, _| match range {
        HistoryRange::OneYear => MockReply::Series(closes(&[45.0, -135.0, 90.0])),
        _ => MockReply::Series(healthy_series(90.0, range)),
    }));
    let coordinator = coordinator(vec![provider]);

    let result = coordinator.run_cycle(&tracked(&[("AAA", 100.0)])).await;

    assert_eq!(result.summary.successful, 1);
    assert_eq!(result.summary.failed, 0);
    assert!(result.summary.failed_tickers.is_empty());
    let record = &result.tickers[0];
    assert_eq!(record.current_price, 90.0);
    assert_eq!(record.week52_high, None);
    assert_eq!(record.week52_low, None);
    assert_eq!(record.distance_from_52w_high, None);
    assert!(record.alert_triggered);
}

#[tokio::test]
async fn test_cycles_sharing_a_cache_do_not_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        MockProvider::new("yahoo", |_, range, _| {
            MockReply::Series(healthy_series(10.0, range))
        })
        .with_delay(Duration::from_millis(20)),
    );
    let coordinator = coordinator(vec![provider.clone()])
        .with_pool_size(1)
        .with_cache_reset(dir.path().join("cache"));
    let tracked = tracked(&[("AAA", 5.0)]);

    let (first, second) =
        tokio::join!(coordinator.run_cycle(&tracked), coordinator.run_cycle(&tracked));

    assert_eq!(first.summary.successful, 1);
    assert_eq!(second.summary.successful, 1);
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_repeated_cycles_are_identical_for_unchanged_data() {
    let provider = Arc::new(healthy_provider("yahoo", &[("AAA", 90.0), ("BBB", 60.0)]));
    let coordinator = coordinator(vec![provider]);
    let tracked = tracked(&[("AAA", 100.0), ("BBB", 50.0), ("ZZZ", 1.0)]);

    let first = coordinator.run_cycle(&tracked).await;
    let second = coordinator.run_cycle(&tracked).await;

    assert_eq!(without_timestamps(first), without_timestamps(second));
}

#[tokio::test]
async fn test_pool_bounds_concurrent_fetches() {
    let symbols: Vec<(String, f64)> = (0..6).map(|i| (format!("S{i}"), 1.0)).collect();
    let provider = Arc::new(
        MockProvider::new("yahoo", |_, range, _| {
            MockReply::Series(healthy_series(10.0, range))
        })
        .with_delay(Duration::from_millis(20)),
    );
    let coordinator = coordinator(vec![provider.clone()]).with_pool_size(2);

    let result = coordinator
        .run_cycle(&TrackedSet::new(symbols).unwrap())
        .await;

    assert_eq!(result.summary.successful, 6);
    assert!(provider.max_in_flight() <= 2, "saw {}", provider.max_in_flight());
    assert!(provider.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_zero_pool_size_fails_the_cycle() {
    let provider = Arc::new(healthy_provider("yahoo", &[("AAA", 90.0)]));
    let coordinator = coordinator(vec![provider.clone()]).with_pool_size(0);

    let result = coordinator
        .run_cycle(&tracked(&[("AAA", 100.0), ("BBB", 50.0)]))
        .await;

    assert!(result.is_cycle_failure());
    assert!(result.error.unwrap().contains("pool size"));
    assert!(result.tickers.is_empty());
    assert_eq!(result.summary.failed_tickers, vec!["AAA", "BBB"]);
    assert!(result
        .summary
        .failures
        .iter()
        .all(|f| f.reason == FailureReason::DispatchFailed));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_empty_tracked_set() {
    let coordinator = coordinator(vec![Arc::new(healthy_provider("yahoo", &[]))]);
    let result = coordinator.run_cycle(&TrackedSet::default()).await;

    assert!(result.error.is_none());
    assert_eq!(result.summary.total_tickers, 0);
    assert!(result.tickers.is_empty());
}

#[tokio::test]
async fn test_cache_is_reset_before_each_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    tokio::fs::create_dir_all(cache_dir.join("yahoo")).await.unwrap();
    tokio::fs::write(cache_dir.join("yahoo/AAA.recent.json"), "{}")
        .await
        .unwrap();

    let coordinator = coordinator(vec![Arc::new(healthy_provider("yahoo", &[("AAA", 90.0)]))])
        .with_cache_reset(cache_dir.clone());
    let result = coordinator.run_cycle(&tracked(&[("AAA", 100.0)])).await;

    assert_eq!(result.summary.successful, 1);
    assert!(!cache_dir.exists());
}

#[tokio::test]
async fn test_missing_cache_dir_does_not_fail_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(vec![Arc::new(healthy_provider("yahoo", &[("AAA", 90.0)]))])
        .with_cache_reset(dir.path().join("never-created"));

    let result = coordinator.run_cycle(&tracked(&[("AAA", 100.0)])).await;
    assert_eq!(result.summary.successful, 1);
}

#[tokio::test]
async fn test_cycle_metrics_are_recorded() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let coordinator = coordinator(vec![Arc::new(healthy_provider("yahoo", &[("AAA", 90.0)]))])
        .with_metrics(metrics.clone());

    coordinator
        .run_cycle(&tracked(&[("AAA", 100.0), ("ZZZ", 1.0)]))
        .await;

    assert_eq!(metrics.fetch_cycles_total.get(), 1);
    assert_eq!(metrics.fetch_cycle_failures_total.get(), 0);
    assert_eq!(metrics.symbol_fetch_failures_total.get(), 1);
    assert_eq!(metrics.fetch_cycle_duration_seconds.get_sample_count(), 1);
}

#[test]
fn test_defaults() {
    let coordinator = coordinator(vec![Arc::new(healthy_provider("yahoo", &[]))]);
    assert_eq!(coordinator.pool_size(), 8);
    assert_eq!(coordinator.task_timeout(), Duration::from_secs(45));
}
