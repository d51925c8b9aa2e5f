//! Store-backed hypothesis operations.
//!
//! Every mutation re-reads the hypothesis collection, applies the change to
//! one hypothesis through the [`HypothesisStateMachine`], and writes the
//! collection back only when the change succeeded. Side effects of a
//! transition (learning records, unblock handoffs, notifications) are
//! persisted after the hypothesis itself.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Hypothesis, HypothesisStatus, HypothesisThresholds, Learning, Notification, NotificationKind,
    RolesConfig, TradeRecord, TrackedMarket,
};
use crate::domain::ports::{notify_best_effort, Notifier, StateStore};
use crate::services::hypothesis_lifecycle::{
    EvidenceOutcome, HypothesisStateMachine, TransitionEffects, TransitionMode,
};

/// Fields for a new hypothesis.
#[derive(Debug, Clone, Default)]
pub struct NewHypothesis {
    pub statement: String,
    pub rationale: String,
    pub test_method: String,
    pub entry_rules: Option<String>,
    pub exit_rules: Option<String>,
    /// Starting confidence; the configured default when absent.
    pub confidence: Option<f64>,
    pub markets: Vec<TrackedMarket>,
    pub min_sample_size: Option<u32>,
    pub expected_payoff: Option<f64>,
    pub tags: Vec<String>,
}

pub struct HypothesisService<S: StateStore + ?Sized> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    machine: HypothesisStateMachine,
}

impl<S: StateStore + ?Sized> HypothesisService<S> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        thresholds: HypothesisThresholds,
        roles: RolesConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            machine: HypothesisStateMachine::new(thresholds, roles),
        }
    }

    pub fn state_machine(&self) -> &HypothesisStateMachine {
        &self.machine
    }

    /// Record a new proposed hypothesis.
    pub async fn create(&self, new: NewHypothesis) -> DomainResult<Hypothesis> {
        if new.statement.trim().is_empty() {
            return Err(DomainError::MissingField("statement".to_string()));
        }
        let confidence = new
            .confidence
            .unwrap_or(self.machine.thresholds().initial_confidence);
        if !confidence.is_finite() {
            return Err(DomainError::ValidationFailed(
                "confidence must be a finite number".to_string(),
            ));
        }
        if new
            .expected_payoff
            .is_some_and(|p| !(p > 0.0 && p.is_finite()))
        {
            return Err(DomainError::ValidationFailed(
                "expected payoff must be positive and finite".to_string(),
            ));
        }

        let mut hypothesis = Hypothesis::new(
            new.statement.trim(),
            new.rationale,
            new.test_method,
            confidence,
        )
        .with_tags(new.tags);
        hypothesis.entry_rules = new.entry_rules;
        hypothesis.exit_rules = new.exit_rules;
        hypothesis.markets = new.markets;
        hypothesis.min_sample_size = new.min_sample_size;
        hypothesis.expected_payoff = new.expected_payoff;

        let mut all = self.store.load_hypotheses().await?;
        all.push(hypothesis.clone());
        self.store.save_hypotheses(&all).await?;

        tracing::info!(
            hypothesis_id = %hypothesis.id,
            confidence = hypothesis.confidence,
            "Hypothesis created"
        );
        Ok(hypothesis)
    }

    pub async fn get(&self, id: &str) -> DomainResult<Hypothesis> {
        self.store
            .load_hypotheses()
            .await?
            .into_iter()
            .find(|h| h.id == id)
            .ok_or_else(|| DomainError::HypothesisNotFound(id.to_string()))
    }

    /// List hypotheses, optionally filtered by status, oldest first.
    pub async fn list(&self, status: Option<HypothesisStatus>) -> DomainResult<Vec<Hypothesis>> {
        let mut all = self.store.load_hypotheses().await?;
        if let Some(status) = status {
            all.retain(|h| h.status == status);
        }
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    pub async fn learnings(&self) -> DomainResult<Vec<Learning>> {
        self.store.load_learnings().await
    }

    /// Explicitly requested transition.
    ///
    /// `reason` is required for `blocked` and becomes the conclusion for the
    /// terminal statuses.
    pub async fn transition(
        &self,
        id: &str,
        to: HypothesisStatus,
        reason: Option<&str>,
    ) -> DomainResult<Hypothesis> {
        let now = Utc::now();
        let result = self
            .mutate(id, |h| {
                self.machine
                    .transition(h, to, TransitionMode::Manual, reason, now)
            })
            .await;

        match result {
            Ok((hypothesis, effects)) => {
                self.apply_effects(&hypothesis, &effects).await?;
                Ok(hypothesis)
            }
            Err(e) => {
                if e.is_validation() {
                    self.notify_rejection(id, to, &e).await;
                }
                Err(e)
            }
        }
    }

    /// Append evidence and run the automatic transition guards.
    pub async fn add_evidence(
        &self,
        id: &str,
        observation: &str,
        support: Option<bool>,
        confidence_delta: f64,
    ) -> DomainResult<(Hypothesis, EvidenceOutcome)> {
        let now = Utc::now();
        let (hypothesis, outcome) = self
            .mutate(id, |h| {
                self.machine
                    .add_evidence(h, observation, support, confidence_delta, now)
            })
            .await?;

        tracing::debug!(
            hypothesis_id = %hypothesis.id,
            from = outcome.previous_confidence,
            to = outcome.confidence,
            "Evidence recorded"
        );
        if let Some(effects) = &outcome.auto_transition {
            self.apply_effects(&hypothesis, effects).await?;
        }
        Ok((hypothesis, outcome))
    }

    /// Record a resolved trade against the hypothesis' test results.
    pub async fn record_trade(&self, id: &str, won: bool, pnl: f64) -> DomainResult<Hypothesis> {
        if !pnl.is_finite() {
            return Err(DomainError::ValidationFailed(format!("pnl must be finite, got {pnl}")));
        }
        let now = Utc::now();
        let (hypothesis, ()) = self
            .mutate(id, |h| {
                if !h.status.accepts_evidence() {
                    return Err(DomainError::HypothesisNotActive {
                        id: h.id.clone(),
                        status: h.status.to_string(),
                    });
                }
                if !(h.test_results.total_pnl + pnl).is_finite() {
                    return Err(DomainError::ValidationFailed(
                        "total pnl would overflow".to_string(),
                    ));
                }
                h.record_trade(won, pnl, now);
                Ok(())
            })
            .await?;
        Ok(hypothesis)
    }

    /// Fold a closed paper trade into the hypothesis that opened it.
    ///
    /// The trade is counted in the test results and recorded as evidence
    /// supporting the hypothesis on a win and contradicting it on a loss.
    pub async fn record_closed_trade(
        &self,
        id: &str,
        trade: &TradeRecord,
    ) -> DomainResult<(Hypothesis, EvidenceOutcome)> {
        let won = trade.is_win();
        self.record_trade(id, won, trade.pnl).await?;

        let delta = self.machine.thresholds().closed_trade_confidence_delta;
        let observation = format!(
            "Closed {} on {} at {:.3} ({}): pnl {:+.2}",
            trade.position_id,
            trade.market_id,
            trade.exit_price,
            trade.reason.as_str(),
            trade.pnl
        );
        self.add_evidence(id, &observation, Some(won), if won { delta } else { -delta })
            .await
    }

    /// Apply the automatic guards outside of evidence addition.
    pub async fn evaluate(&self, id: &str) -> DomainResult<(Hypothesis, Option<HypothesisStatus>)> {
        let now = Utc::now();
        let (hypothesis, effects) = self.mutate(id, |h| self.machine.evaluate(h, now)).await?;
        let to = effects.as_ref().map(|e| e.to);
        if let Some(effects) = &effects {
            self.apply_effects(&hypothesis, effects).await?;
        }
        Ok((hypothesis, to))
    }

    /// Load, change one hypothesis, save. Nothing is written on error.
    async fn mutate<T, F>(&self, id: &str, f: F) -> DomainResult<(Hypothesis, T)>
    where
        F: FnOnce(&mut Hypothesis) -> DomainResult<T>,
    {
        let mut all = self.store.load_hypotheses().await?;
        let idx = all
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| DomainError::HypothesisNotFound(id.to_string()))?;

        let mut working = all[idx].clone();
        let out = f(&mut working)?;
        all[idx] = working.clone();
        self.store.save_hypotheses(&all).await?;
        Ok((working, out))
    }

    async fn apply_effects(
        &self,
        hypothesis: &Hypothesis,
        effects: &TransitionEffects,
    ) -> DomainResult<()> {
        tracing::info!(
            hypothesis_id = %hypothesis.id,
            from = %effects.from,
            to = %effects.to,
            automatic = effects.mode == TransitionMode::Automatic,
            "Hypothesis transitioned"
        );

        if let Some(learning) = &effects.learning {
            self.store.append_learning(learning).await?;
        }
        if let Some(handoff) = &effects.handoff {
            let mut handoffs = self.store.load_handoffs().await?;
            handoffs.push(handoff.clone());
            self.store.save_handoffs(&handoffs).await?;
        }

        let mut body = hypothesis.statement.clone();
        if let Some(conclusion) = &hypothesis.conclusion {
            if effects.to.is_terminal() {
                body = format!("{body}\n{conclusion}");
            }
        }
        if let Some(reason) = &hypothesis.blocked_reason {
            body = format!("{body}\nBlocked: {reason}");
        }
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                NotificationKind::HypothesisTransition,
                format!("{} {} -> {}", hypothesis.id, effects.from, effects.to),
                body,
            ),
        )
        .await;
        Ok(())
    }

    async fn notify_rejection(&self, id: &str, to: HypothesisStatus, error: &DomainError) {
        tracing::warn!(hypothesis_id = %id, to = %to, error = %error, "Transition rejected");
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                NotificationKind::TransitionRejected,
                format!("{id} -> {to} rejected"),
                error.to_string(),
            ),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifiers::RecordingNotifier;
    use crate::adapters::store::MemoryStore;
    use crate::domain::models::{ExitReason, HandoffStatus, Position};

    fn service() -> (HypothesisService<MemoryStore>, Arc<MemoryStore>, RecordingNotifier) {
        let store = Arc::new(MemoryStore::new());
        let notifier = RecordingNotifier::new();
        let svc = HypothesisService::new(
            store.clone(),
            Arc::new(notifier.clone()),
            HypothesisThresholds::default(),
            RolesConfig::default(),
        );
        (svc, store, notifier)
    }

    fn new_hypothesis() -> NewHypothesis {
        NewHypothesis {
            statement: "Favorites drift up in the last day".to_string(),
            rationale: "late money".to_string(),
            test_method: "buy favorites when 24h from close".to_string(),
            ..NewHypothesis::default()
        }
    }

    #[tokio::test]
    async fn test_create_uses_default_confidence() {
        let (svc, _, _) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        assert_eq!(h.status, HypothesisStatus::Proposed);
        assert!((h.confidence - 0.5).abs() < f64::EPSILON);
        assert!(h.id.starts_with("hyp_"));
        assert_eq!(svc.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_statement() {
        let (svc, store, _) = service();
        let err = svc
            .create(NewHypothesis {
                statement: "  ".to_string(),
                ..new_hypothesis()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingField(_)));
        assert!(store.load_hypotheses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_store_untouched() {
        let (svc, store, notifier) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        let before = store.load_hypotheses().await.unwrap();

        let err = svc
            .transition(&h.id, HypothesisStatus::Validated, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(store.load_hypotheses().await.unwrap(), before);

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::TransitionRejected);
    }

    #[tokio::test]
    async fn test_non_finite_inputs_leave_store_loadable() {
        let (svc, store, _) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        svc.transition(&h.id, HypothesisStatus::Testing, None)
            .await
            .unwrap();
        let before = store.load_hypotheses().await.unwrap();

        let err = svc
            .add_evidence(&h.id, "huge", Some(true), f64::INFINITY)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        let err = svc.record_trade(&h.id, true, f64::NEG_INFINITY).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));

        svc.record_trade(&h.id, true, f64::MAX).await.unwrap();
        let err = svc.record_trade(&h.id, true, f64::MAX).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));

        let after = store.load_hypotheses().await.unwrap();
        assert_eq!(after[0].evidence, before[0].evidence);
        assert_eq!(after[0].test_results.trades, 1);
        assert!(after[0].test_results.total_pnl.is_finite());
        let json = serde_json::to_string(&after).unwrap();
        let reloaded: Vec<Hypothesis> = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, after);
    }

    #[tokio::test]
    async fn test_create_rejects_infinite_payoff() {
        let (svc, store, _) = service();
        let err = svc
            .create(NewHypothesis {
                expected_payoff: Some(f64::INFINITY),
                ..new_hypothesis()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert!(store.load_hypotheses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_hypothesis() {
        let (svc, _, _) = service();
        let err = svc.add_evidence("hyp_nope", "x", None, 0.1).await.unwrap_err();
        assert!(matches!(err, DomainError::HypothesisNotFound(_)));
    }

    #[tokio::test]
    async fn test_block_persists_handoff() {
        let (svc, store, _) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        let blocked = svc
            .transition(&h.id, HypothesisStatus::Blocked, Some("market data API down"))
            .await
            .unwrap();
        assert_eq!(blocked.status, HypothesisStatus::Blocked);

        let handoffs = store.load_handoffs().await.unwrap();
        assert_eq!(handoffs.len(), 1);
        assert_eq!(handoffs[0].status, HandoffStatus::Pending);
        assert_eq!(handoffs[0].context.hypothesis_id.as_deref(), Some(h.id.as_str()));
    }

    #[tokio::test]
    async fn test_auto_invalidation_appends_learning() {
        let (svc, store, notifier) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        svc.transition(&h.id, HypothesisStatus::Testing, None).await.unwrap();

        let (after, outcome) = svc
            .add_evidence(&h.id, "crowd was right", Some(false), -0.3)
            .await
            .unwrap();
        assert_eq!(after.status, HypothesisStatus::Invalidated);
        assert!(outcome.auto_transition.is_some());

        let learnings = store.load_learnings().await.unwrap();
        assert_eq!(learnings.len(), 1);
        assert_eq!(learnings[0].hypothesis_id, h.id);
        assert_eq!(learnings[0].contradicting, 1);

        let kinds: Vec<_> = notifier.sent().await.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::HypothesisTransition,
                NotificationKind::HypothesisTransition
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_trade_counts_and_adds_evidence() {
        let (svc, _, _) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        svc.transition(&h.id, HypothesisStatus::Testing, None).await.unwrap();

        let position = Position {
            id: "pos_1".to_string(),
            market_id: "m1".to_string(),
            market_question: String::new(),
            side: "YES".to_string(),
            shares: 100.0,
            entry_price: 0.4,
            current_price: 0.6,
            stop_loss: None,
            take_profit: Some(0.6),
            hypothesis_id: Some(h.id.clone()),
            opened_at: Utc::now(),
        };
        let trade = TradeRecord::closing(&position, 0.6, ExitReason::TakeProfit, Utc::now());
        let (after, outcome) = svc.record_closed_trade(&h.id, &trade).await.unwrap();

        assert_eq!(after.test_results.trades, 1);
        assert_eq!(after.test_results.wins, 1);
        assert!((outcome.confidence - 0.55).abs() < 1e-9);
        assert_eq!(after.evidence.last().and_then(|e| e.support), Some(true));
    }

    #[tokio::test]
    async fn test_evaluate_without_guard_is_noop() {
        let (svc, _, _) = service();
        let h = svc.create(new_hypothesis()).await.unwrap();
        let (after, to) = svc.evaluate(&h.id).await.unwrap();
        assert!(to.is_none());
        assert_eq!(after.status, HypothesisStatus::Proposed);
    }
}
