//! Push notification delivery for price alerts.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::models::MetricsRecord;

pub const PUSHBULLET_BASE_URL: &str = "https://api.pushbullet.com";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Title and body of the alert pushed for a record at or below its target.
pub fn alert_message(record: &MetricsRecord) -> (String, String) {
    (
        format!("Price Alert: {}", record.ticker),
        format!(
            "The current price of {} is {:.2}, which is below your target of {:.2}.",
            record.ticker, record.current_price, record.target_price
        ),
    )
}

pub struct PushbulletNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PushbulletNotifier {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self::with_base_url(client, PUSHBULLET_BASE_URL, token)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/v2/pushes", self.base_url))
            .header("Access-Token", &self.token)
            .json(&json!({ "type": "note", "title": title, "body": body }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Writes alerts to the log when no push channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(title, body, "ALERT");
        Ok(())
    }
}
