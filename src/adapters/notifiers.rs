//! Notification sinks.
//!
//! The engine emits one-way notifications about task starts, completions,
//! failures and hypothesis transitions. Delivery is best effort; a failing
//! sink never fails a tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Notification, NotificationConfig};
use crate::domain::ports::Notifier;

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> DomainResult<()> {
        tracing::info!(
            kind = notification.kind.as_str(),
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    kind: &'static str,
    title: &'a str,
    body: &'a str,
    at: String,
}

/// Posts notifications as JSON to a chat webhook.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> DomainResult<()> {
        let payload = WebhookPayload {
            text: notification.render(),
            kind: notification.kind.as_str(),
            title: &notification.title,
            body: &notification.body,
            at: notification.at.to_rfc3339(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("Webhook request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::ExecutionFailed(format!(
                "Webhook returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Sends every notification to each inner sink, continuing past failures.
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Tracing always, plus a webhook when one is configured.
    pub fn from_config(config: &NotificationConfig) -> DomainResult<Self> {
        let mut fanout = Self::new().with_sink(Arc::new(TracingNotifier));
        if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            fanout = fanout.with_sink(Arc::new(WebhookNotifier::new(url, config.timeout_secs)?));
        }
        Ok(fanout)
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) -> DomainResult<()> {
        let mut last_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(notification).await {
                tracing::warn!(error = %e, "Notification sink failed");
                last_error = Some(e);
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Keeps every notification in memory. Handy in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> DomainResult<()> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NotificationKind;

    #[tokio::test]
    async fn test_webhook_posts_rendered_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "kind": "task_failed",
                "title": "Task failed",
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url()), 5).unwrap();
        let n = Notification::new(NotificationKind::TaskFailed, "Task failed", "exit 1");
        notifier.notify(&n).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url()), 5).unwrap();
        let n = Notification::new(NotificationKind::Info, "hello", "");
        let err = notifier.notify(&n).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_fanout_continues_past_failures() {
        let recorder = RecordingNotifier::new();
        let failing = WebhookNotifier::new("http://127.0.0.1:9/unreachable", 1).unwrap();
        let fanout = FanoutNotifier::new()
            .with_sink(Arc::new(failing))
            .with_sink(Arc::new(recorder.clone()));

        let n = Notification::new(NotificationKind::Info, "hello", "world");
        assert!(fanout.notify(&n).await.is_err());
        assert_eq!(recorder.sent().await.len(), 1);
    }
}
