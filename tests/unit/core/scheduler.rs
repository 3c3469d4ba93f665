//! Unit tests for the cycle scheduler

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tickerwatch::core::scheduler::{CycleScheduler, SchedulerError};
use tickerwatch::models::TrackedSet;
use tickerwatch::pipeline::FetchCoordinator;
use tickerwatch::services::{Notifier, NotifyError};

use crate::support::{fetcher, healthy_provider};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

fn scheduler(pool_size: usize, notifier: Arc<RecordingNotifier>) -> CycleScheduler {
    let provider = Arc::new(healthy_provider("yahoo", &[("AAA", 90.0), ("BBB", 60.0)]));
    let coordinator =
        FetchCoordinator::new(Arc::new(fetcher(vec![provider]))).with_pool_size(pool_size);
    let tracked = TrackedSet::new([("AAA", 100.0), ("BBB", 50.0)]).unwrap();

    CycleScheduler::new(
        Arc::new(coordinator),
        Arc::new(tracked),
        notifier,
        "0 0 9 * * *",
    )
    .unwrap()
}

#[tokio::test]
async fn test_run_once_notifies_each_alert() {
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(4, notifier.clone());

    let result = scheduler.run_once().await;
    assert_eq!(result.summary.alerts_triggered.len(), 1);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "Price Alert: AAA");
    assert_eq!(
        sent[0].1,
        "The current price of AAA is 90.00, which is below your target of 100.00."
    );
}

#[tokio::test]
async fn test_failed_cycle_sends_nothing() {
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = scheduler(0, notifier.clone());

    let result = scheduler.run_once().await;
    assert!(result.is_cycle_failure());
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_and_stop() {
    let scheduler = scheduler(4, Arc::new(RecordingNotifier::default()));
    assert!(!scheduler.is_running().await);

    scheduler.start().await.unwrap();
    assert!(scheduler.is_running().await);
    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::AlreadyRunning)
    ));

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);
}

#[test]
fn test_rejects_invalid_cron() {
    let provider = Arc::new(healthy_provider("yahoo", &[]));
    let coordinator = FetchCoordinator::new(Arc::new(fetcher(vec![provider])));

    let result = CycleScheduler::new(
        Arc::new(coordinator),
        Arc::new(TrackedSet::default()),
        Arc::new(RecordingNotifier::default()),
        "not a cron",
    );
    assert!(matches!(result, Err(SchedulerError::InvalidSchedule { .. })));
}
