//! Cross-role handoff queue.
//!
//! Handoffs move strictly forward: `pending -> in_progress -> completed|failed`.
//! Terminal handoffs keep their result and are never selected again.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Handoff, HandoffContext, HandoffResult, HandoffStatus, PriorityTier};
use crate::domain::ports::StateStore;

/// Highest-tier pending handoff; equal tiers go to the oldest.
pub fn select_next_pending(handoffs: &[Handoff]) -> Option<&Handoff> {
    handoffs
        .iter()
        .filter(|h| h.status == HandoffStatus::Pending)
        .min_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        })
}

pub struct HandoffQueue<S: StateStore + ?Sized> {
    store: Arc<S>,
}

impl<S: StateStore + ?Sized> HandoffQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        from_role: &str,
        to_role: &str,
        handoff_type: &str,
        priority: PriorityTier,
        context: HandoffContext,
    ) -> DomainResult<Handoff> {
        for (field, value) in [
            ("from_role", from_role),
            ("to_role", to_role),
            ("handoff_type", handoff_type),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field.to_string()));
            }
        }

        let handoff = Handoff::new(from_role, to_role, handoff_type, priority, context);
        let mut all = self.store.load_handoffs().await?;
        all.push(handoff.clone());
        self.store.save_handoffs(&all).await?;
        tracing::info!(
            handoff_id = %handoff.id,
            from = from_role,
            to = to_role,
            priority = %priority,
            "Handoff created"
        );
        Ok(handoff)
    }

    /// All handoffs, optionally filtered by status, oldest first.
    pub async fn list(&self, status: Option<HandoffStatus>) -> DomainResult<Vec<Handoff>> {
        let mut all = self.store.load_handoffs().await?;
        if let Some(status) = status {
            all.retain(|h| h.status == status);
        }
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    pub async fn next_pending(&self) -> DomainResult<Option<Handoff>> {
        let all = self.store.load_handoffs().await?;
        Ok(select_next_pending(&all).cloned())
    }

    /// Mark a pending handoff as in progress.
    pub async fn start(&self, id: &str) -> DomainResult<Handoff> {
        self.advance(id, HandoffStatus::InProgress, None).await
    }

    pub async fn complete(&self, id: &str, result: HandoffResult) -> DomainResult<Handoff> {
        self.advance(id, HandoffStatus::Completed, Some(result)).await
    }

    pub async fn fail(&self, id: &str, result: HandoffResult) -> DomainResult<Handoff> {
        self.advance(id, HandoffStatus::Failed, Some(result)).await
    }

    async fn advance(
        &self,
        id: &str,
        to: HandoffStatus,
        result: Option<HandoffResult>,
    ) -> DomainResult<Handoff> {
        let mut all = self.store.load_handoffs().await?;
        let handoff = all
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| DomainError::HandoffNotFound(id.to_string()))?;

        if !handoff.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: handoff.status.to_string(),
                to: to.to_string(),
                reason: "handoffs only move forward".to_string(),
            });
        }

        let now = Utc::now();
        handoff.status = to;
        handoff.updated_at = now;
        match to {
            HandoffStatus::InProgress => handoff.started_at = Some(now),
            HandoffStatus::Completed | HandoffStatus::Failed => {
                handoff.completed_at = Some(now);
                handoff.result = result;
            }
            HandoffStatus::Pending => {}
        }
        let updated = handoff.clone();
        self.store.save_handoffs(&all).await?;
        tracing::debug!(handoff_id = %id, status = %to, "Handoff advanced");
        Ok(updated)
    }
}
