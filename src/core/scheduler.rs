//! Cron-based scheduler that re-runs the fetch cycle and pushes alerts

use std::str::FromStr;
use std::sync::Arc;

use cron::Schedule;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{AggregateResult, TrackedSet};
use crate::pipeline::FetchCoordinator;
use crate::services::notification::{alert_message, Notifier};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Scheduler that periodically runs a fetch cycle and notifies on alerts
pub struct CycleScheduler {
    coordinator: Arc<FetchCoordinator>,
    tracked: Arc<TrackedSet>,
    notifier: Arc<dyn Notifier>,
    schedule: Schedule,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl CycleScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `coordinator` - Runs the fetch cycles
    /// * `tracked` - Symbols and targets passed to every cycle
    /// * `notifier` - Receives one message per alert-triggered record
    /// * `cron_expr` - Six-field cron expression (seconds first), evaluated in UTC
    pub fn new(
        coordinator: Arc<FetchCoordinator>,
        tracked: Arc<TrackedSet>,
        notifier: Arc<dyn Notifier>,
        cron_expr: &str,
    ) -> Result<Self, SchedulerError> {
        let schedule =
            Schedule::from_str(cron_expr).map_err(|e| SchedulerError::InvalidSchedule {
                expr: cron_expr.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            cron = %cron_expr,
            symbols = tracked.len(),
            "CycleScheduler: created (cron: {})",
            cron_expr
        );

        Ok(Self {
            coordinator,
            tracked,
            notifier,
            schedule,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Run a single cycle now and dispatch its alerts.
    pub async fn run_once(&self) -> AggregateResult {
        run_and_notify(&self.coordinator, &self.tracked, self.notifier.as_ref()).await
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut guard = self.handle.write().await;
        if guard.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let coordinator = self.coordinator.clone();
        let tracked = self.tracked.clone();
        let notifier = self.notifier.clone();
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!("CycleScheduler: started, waiting for cron schedule...");

            loop {
                let next_tick = schedule.upcoming(chrono::Utc).next();
                match next_tick {
                    Some(next_tick) => {
                        let now = chrono::Utc::now();
                        if next_tick > now {
                            let duration = (next_tick - now).to_std().unwrap_or_default();
                            debug!(next = %next_tick, "CycleScheduler: sleeping until next tick");
                            tokio::time::sleep(duration).await;
                        }
                    }
                    None => {
                        // No more scheduled times, wait a bit and check again
                        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
                        continue;
                    }
                }

                info!(symbols = tracked.len(), "CycleScheduler: cron tick, running fetch cycle");
                run_and_notify(&coordinator, &tracked, notifier.as_ref()).await;
            }
        });

        *guard = Some(handle);
        info!("CycleScheduler: started successfully");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("CycleScheduler: stopped");
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.is_some()
    }
}

async fn run_and_notify(
    coordinator: &FetchCoordinator,
    tracked: &TrackedSet,
    notifier: &dyn Notifier,
) -> AggregateResult {
    let result = coordinator.run_cycle(tracked).await;
    if let Some(error) = &result.error {
        warn!(error = %error, "CycleScheduler: cycle failed, no alerts sent");
        return result;
    }

    for record in &result.summary.alerts_triggered {
        let (title, body) = alert_message(record);
        match notifier.notify(&title, &body).await {
            Ok(()) => debug!(symbol = %record.ticker, "CycleScheduler: alert sent"),
            Err(e) => warn!(
                symbol = %record.ticker,
                error = %e,
                "CycleScheduler: failed to send alert"
            ),
        }
    }
    result
}
