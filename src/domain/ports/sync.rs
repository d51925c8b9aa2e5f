//! Store synchronization and notification ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Notification;

/// Pulls and pushes the shared store from an external synchronization point.
///
/// Both calls are best effort: they report success as a bool and never fail
/// the tick.
#[async_trait]
pub trait StoreSync: Send + Sync {
    async fn pull(&self) -> bool;

    async fn push(&self) -> bool;
}

/// Fire-and-forget sink for human-readable notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> DomainResult<()>;
}

/// Send a notification, logging instead of propagating any failure.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(&notification).await {
        tracing::warn!(
            kind = notification.kind.as_str(),
            error = %e,
            "Failed to send notification"
        );
    }
}
