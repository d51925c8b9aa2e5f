//! Hypothesis state machine.
//!
//! Validates and applies status transitions, applies evidence-driven
//! confidence updates, and fires the automatic transitions those updates
//! trigger. Everything here works on a single in-memory hypothesis;
//! persistence lives in [`HypothesisService`](super::hypothesis_service).
//!
//! Transitions are applied to a copy and committed only when every guard
//! passes, so a rejected transition never leaves a hypothesis half-changed.

use chrono::{DateTime, Utc};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Handoff, HandoffContext, Hypothesis, HypothesisStatus, HypothesisThresholds, Learning,
    PriorityTier, RolesConfig,
};

/// Handoff type created when a hypothesis gets blocked.
pub const UNBLOCK_HANDOFF_TYPE: &str = "unblock-hypothesis";

/// Who asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode {
    /// An explicit call by a person or worker. Kills are always allowed.
    Manual,
    /// Fired by the engine itself; kills need a confidence or win-rate reason.
    Automatic,
}

/// Side effects produced by a successful transition.
#[derive(Debug, Clone)]
pub struct TransitionEffects {
    /// Status before the transition.
    pub from: HypothesisStatus,
    /// Status after the transition.
    pub to: HypothesisStatus,
    /// Whether the engine or a caller asked for it.
    pub mode: TransitionMode,
    /// Emitted when the hypothesis reaches a terminal status.
    pub learning: Option<Learning>,
    /// Emitted when the hypothesis gets blocked.
    pub handoff: Option<Handoff>,
}

/// Result of adding evidence.
#[derive(Debug, Clone)]
pub struct EvidenceOutcome {
    /// Confidence before the evidence was applied.
    pub previous_confidence: f64,
    /// Clamped confidence after the evidence was applied.
    pub confidence: f64,
    /// The automatic transition the evidence triggered, if any.
    pub auto_transition: Option<TransitionEffects>,
}

/// The hypothesis state machine, parameterized by thresholds.
#[derive(Debug, Clone, Default)]
pub struct HypothesisStateMachine {
    thresholds: HypothesisThresholds,
    roles: RolesConfig,
}

impl HypothesisStateMachine {
    pub fn new(thresholds: HypothesisThresholds, roles: RolesConfig) -> Self {
        Self { thresholds, roles }
    }

    pub fn thresholds(&self) -> &HypothesisThresholds {
        &self.thresholds
    }

    /// Check every guard for `from -> to` without touching the hypothesis.
    pub fn check_transition(
        &self,
        hypothesis: &Hypothesis,
        to: HypothesisStatus,
        mode: TransitionMode,
        reason: Option<&str>,
    ) -> DomainResult<()> {
        let from = hypothesis.status;
        if !from.can_transition_to(to) {
            return Err(invalid(from, to, "transition not permitted"));
        }

        match (from, to) {
            (HypothesisStatus::Proposed, HypothesisStatus::Testing) => {
                if !hypothesis.has_test_method() {
                    return Err(DomainError::MissingField("test_method".to_string()));
                }
                if !hypothesis.has_entry_criteria() {
                    return Err(invalid(
                        from,
                        to,
                        "no entry rules and the test method does not describe entry criteria",
                    ));
                }
                Ok(())
            }
            (HypothesisStatus::Blocked, HypothesisStatus::Testing) => {
                if hypothesis.has_test_method() {
                    Ok(())
                } else {
                    Err(DomainError::MissingField("test_method".to_string()))
                }
            }
            (HypothesisStatus::Testing, HypothesisStatus::Validated) => {
                self.validation_guard(hypothesis)
            }
            (_, HypothesisStatus::Invalidated) => match mode {
                TransitionMode::Manual => Ok(()),
                TransitionMode::Automatic => {
                    if self.invalidation_reason(hypothesis).is_some() {
                        Ok(())
                    } else {
                        Err(invalid(
                            from,
                            to,
                            "automatic invalidation needs low confidence or a losing full sample",
                        ))
                    }
                }
            },
            (_, HypothesisStatus::Blocked) => {
                if reason.is_some_and(|r| !r.trim().is_empty()) {
                    Ok(())
                } else {
                    Err(DomainError::MissingField("reason".to_string()))
                }
            }
            // blocked -> proposed is unconditional
            _ => Ok(()),
        }
    }

    /// Guard for `testing -> validated`: confidence, sample size and win rate.
    pub fn validation_guard(&self, hypothesis: &Hypothesis) -> DomainResult<()> {
        let t = &self.thresholds;
        if hypothesis.confidence < t.validation_confidence {
            return Err(invalid(
                hypothesis.status,
                HypothesisStatus::Validated,
                &format!(
                    "confidence {:.2} is below {:.2}",
                    hypothesis.confidence, t.validation_confidence
                ),
            ));
        }
        let required = hypothesis.sample_size(t.min_sample_size);
        let actual = hypothesis.test_results.trades;
        if actual < required {
            return Err(DomainError::InsufficientSample { required, actual });
        }
        if hypothesis.test_results.win_rate < t.validation_win_rate {
            return Err(invalid(
                hypothesis.status,
                HypothesisStatus::Validated,
                &format!(
                    "win rate {:.2} is below {:.2}",
                    hypothesis.test_results.win_rate, t.validation_win_rate
                ),
            ));
        }
        Ok(())
    }

    /// Why an automatic kill is justified, if it is.
    pub fn invalidation_reason(&self, hypothesis: &Hypothesis) -> Option<String> {
        let t = &self.thresholds;
        if hypothesis.confidence < t.invalidation_confidence {
            return Some(format!(
                "confidence {:.2} fell below {:.2}",
                hypothesis.confidence, t.invalidation_confidence
            ));
        }
        let results = &hypothesis.test_results;
        if results.trades >= hypothesis.sample_size(t.min_sample_size)
            && results.win_rate < t.invalidation_win_rate
        {
            return Some(format!(
                "win rate {:.2} over {} trades is below {:.2}",
                results.win_rate, results.trades, t.invalidation_win_rate
            ));
        }
        None
    }

    /// Validate and apply a transition. On error the hypothesis is untouched.
    ///
    /// `reason` is the block reason for `blocked`, or the conclusion for the
    /// terminal statuses (a default conclusion is written when absent).
    pub fn transition(
        &self,
        hypothesis: &mut Hypothesis,
        to: HypothesisStatus,
        mode: TransitionMode,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionEffects> {
        self.check_transition(hypothesis, to, mode, reason)?;

        let from = hypothesis.status;
        let mut next = hypothesis.clone();
        next.status = to;
        next.updated_at = now;
        let mut effects = TransitionEffects {
            from,
            to,
            mode,
            learning: None,
            handoff: None,
        };

        match to {
            HypothesisStatus::Testing => {
                next.blocked_reason = None;
                next.started_at.get_or_insert(now);
            }
            HypothesisStatus::Proposed => {
                next.blocked_reason = None;
            }
            HypothesisStatus::Blocked => {
                let reason = reason.unwrap_or_default().trim().to_string();
                next.blocked_reason = Some(reason.clone());
                effects.handoff = Some(Handoff::new(
                    self.roles.research.clone(),
                    self.roles.engineering.clone(),
                    UNBLOCK_HANDOFF_TYPE,
                    PriorityTier::High,
                    HandoffContext {
                        hypothesis_id: Some(next.id.clone()),
                        reason: Some(reason),
                        notes: Some(next.statement.clone()),
                        ..HandoffContext::default()
                    },
                ));
            }
            HypothesisStatus::Validated | HypothesisStatus::Invalidated => {
                let conclusion = reason
                    .filter(|r| !r.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_conclusion(&next, to, mode));
                next.conclusion = Some(conclusion);
                next.ended_at = Some(now);
                effects.learning = Some(Learning::from_hypothesis(&next, now));
            }
        }

        *hypothesis = next;
        Ok(effects)
    }

    /// Append evidence, re-derive confidence, then run the auto-transition
    /// guards in order: invalidate first, validate second.
    pub fn add_evidence(
        &self,
        hypothesis: &mut Hypothesis,
        observation: &str,
        support: Option<bool>,
        confidence_delta: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<EvidenceOutcome> {
        if !hypothesis.status.accepts_evidence() {
            return Err(DomainError::HypothesisNotActive {
                id: hypothesis.id.clone(),
                status: hypothesis.status.to_string(),
            });
        }
        if !confidence_delta.is_finite() {
            return Err(DomainError::ValidationFailed(format!(
                "confidence delta must be finite, got {confidence_delta}"
            )));
        }
        if observation.trim().is_empty() {
            return Err(DomainError::MissingField("observation".to_string()));
        }

        let previous_confidence = hypothesis.confidence;
        let confidence = hypothesis.append_evidence(observation, support, confidence_delta, now);
        let t = &self.thresholds;

        let auto_transition = if confidence <= t.auto_invalidate_confidence {
            let conclusion = format!(
                "Auto-invalidated: confidence {confidence:.2} reached {:.2}",
                t.auto_invalidate_confidence
            );
            Some(self.transition(
                hypothesis,
                HypothesisStatus::Invalidated,
                TransitionMode::Automatic,
                Some(&conclusion),
                now,
            )?)
        } else if confidence >= t.auto_validate_confidence
            && hypothesis.status == HypothesisStatus::Testing
            && self.validation_guard(hypothesis).is_ok()
        {
            let conclusion = format!(
                "Auto-validated: confidence {confidence:.2} with win rate {:.2} over {} trades",
                hypothesis.test_results.win_rate, hypothesis.test_results.trades
            );
            Some(self.transition(
                hypothesis,
                HypothesisStatus::Validated,
                TransitionMode::Automatic,
                Some(&conclusion),
                now,
            )?)
        } else {
            None
        };

        Ok(EvidenceOutcome {
            previous_confidence,
            confidence,
            auto_transition,
        })
    }

    /// Apply the table's automatic guards outside of evidence addition.
    ///
    /// Returns `None` when neither guard fires or the hypothesis is not in
    /// a status the guards apply to.
    pub fn evaluate(
        &self,
        hypothesis: &mut Hypothesis,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<TransitionEffects>> {
        if !hypothesis.status.accepts_evidence() {
            return Ok(None);
        }
        if let Some(reason) = self.invalidation_reason(hypothesis) {
            let conclusion = format!("Auto-invalidated: {reason}");
            return self
                .transition(
                    hypothesis,
                    HypothesisStatus::Invalidated,
                    TransitionMode::Automatic,
                    Some(&conclusion),
                    now,
                )
                .map(Some);
        }
        if hypothesis.status == HypothesisStatus::Testing
            && self.validation_guard(hypothesis).is_ok()
        {
            return self
                .transition(
                    hypothesis,
                    HypothesisStatus::Validated,
                    TransitionMode::Automatic,
                    None,
                    now,
                )
                .map(Some);
        }
        Ok(None)
    }

    /// Whether a hypothesis could be put under test right now.
    pub fn is_testable(&self, hypothesis: &Hypothesis) -> bool {
        match hypothesis.status {
            HypothesisStatus::Testing => true,
            HypothesisStatus::Proposed => self
                .check_transition(
                    hypothesis,
                    HypothesisStatus::Testing,
                    TransitionMode::Manual,
                    None,
                )
                .is_ok(),
            _ => false,
        }
    }
}

fn invalid(from: HypothesisStatus, to: HypothesisStatus, reason: &str) -> DomainError {
    DomainError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        reason: reason.to_string(),
    }
}

fn default_conclusion(hypothesis: &Hypothesis, to: HypothesisStatus, mode: TransitionMode) -> String {
    let verb = match to {
        HypothesisStatus::Validated => "Validated",
        _ => "Invalidated",
    };
    let how = match mode {
        TransitionMode::Manual => "manually",
        TransitionMode::Automatic => "automatically",
    };
    format!(
        "{verb} {how} at confidence {:.2} after {} trades (win rate {:.2})",
        hypothesis.confidence, hypothesis.test_results.trades, hypothesis.test_results.win_rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> HypothesisStateMachine {
        HypothesisStateMachine::default()
    }

    fn testing_hypothesis(confidence: f64, trades: u32, wins: u32) -> Hypothesis {
        let now = Utc::now();
        let mut h = Hypothesis::new("Longshots are overpriced", "bias", "sell when price > 0.9", 0.5)
            .with_id("h1");
        h.status = HypothesisStatus::Testing;
        h.confidence = confidence;
        for i in 0..trades {
            let won = i < wins;
            h.record_trade(won, if won { 1.0 } else { -1.0 }, now);
        }
        h
    }

    #[test]
    fn test_proposed_to_testing_requires_entry_criteria() {
        let sm = machine();
        let now = Utc::now();

        let mut vague = Hypothesis::new("s", "r", "watch the market", 0.5);
        let err = sm
            .transition(&mut vague, HypothesisStatus::Testing, TransitionMode::Manual, None, now)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(vague.status, HypothesisStatus::Proposed);

        let mut empty = Hypothesis::new("s", "r", "  ", 0.5);
        let err = sm
            .transition(&mut empty, HypothesisStatus::Testing, TransitionMode::Manual, None, now)
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingField(_)));

        let mut ready = Hypothesis::new("s", "r", "watch", 0.5).with_entry_rules("yes < 0.2");
        sm.transition(&mut ready, HypothesisStatus::Testing, TransitionMode::Manual, None, now)
            .unwrap();
        assert_eq!(ready.status, HypothesisStatus::Testing);
        assert_eq!(ready.started_at, Some(now));
    }

    #[test]
    fn test_validation_guard() {
        let sm = machine();
        let now = Utc::now();

        let mut thin = testing_hypothesis(0.7, 3, 3);
        let err = sm
            .transition(&mut thin, HypothesisStatus::Validated, TransitionMode::Manual, None, now)
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientSample { required: 5, actual: 3 }));

        let mut losing = testing_hypothesis(0.7, 6, 2);
        assert!(sm
            .transition(&mut losing, HypothesisStatus::Validated, TransitionMode::Manual, None, now)
            .is_err());

        let mut unsure = testing_hypothesis(0.5, 6, 5);
        assert!(sm
            .transition(&mut unsure, HypothesisStatus::Validated, TransitionMode::Manual, None, now)
            .is_err());

        let mut good = testing_hypothesis(0.6, 5, 3);
        let effects = sm
            .transition(&mut good, HypothesisStatus::Validated, TransitionMode::Manual, None, now)
            .unwrap();
        assert_eq!(good.status, HypothesisStatus::Validated);
        assert!(good.conclusion.is_some());
        assert_eq!(good.ended_at, Some(now));
        assert!(effects.learning.is_some());
    }

    #[test]
    fn test_manual_kill_always_allowed_automatic_needs_reason() {
        let sm = machine();
        let now = Utc::now();

        let mut h = testing_hypothesis(0.6, 0, 0);
        assert!(sm
            .transition(&mut h, HypothesisStatus::Invalidated, TransitionMode::Automatic, None, now)
            .is_err());
        assert_eq!(h.status, HypothesisStatus::Testing);

        sm.transition(&mut h, HypothesisStatus::Invalidated, TransitionMode::Manual, Some("gut feel"), now)
            .unwrap();
        assert_eq!(h.status, HypothesisStatus::Invalidated);
        assert_eq!(h.conclusion.as_deref(), Some("gut feel"));

        let mut losing = testing_hypothesis(0.5, 5, 1);
        assert!(sm.invalidation_reason(&losing).is_some());
        sm.transition(&mut losing, HypothesisStatus::Invalidated, TransitionMode::Automatic, None, now)
            .unwrap();
    }

    #[test]
    fn test_block_requires_reason_and_creates_handoff() {
        let sm = machine();
        let now = Utc::now();
        let mut h = testing_hypothesis(0.5, 0, 0);

        let err = sm
            .transition(&mut h, HypothesisStatus::Blocked, TransitionMode::Manual, Some("  "), now)
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingField(_)));

        let effects = sm
            .transition(&mut h, HypothesisStatus::Blocked, TransitionMode::Manual, Some("price feed down"), now)
            .unwrap();
        let handoff = effects.handoff.expect("block should create a handoff");
        assert_eq!(handoff.to_role, "engineering");
        assert_eq!(handoff.handoff_type, UNBLOCK_HANDOFF_TYPE);
        assert_eq!(handoff.context.hypothesis_id.as_deref(), Some("h1"));
        assert_eq!(h.blocked_reason.as_deref(), Some("price feed down"));

        sm.transition(&mut h, HypothesisStatus::Proposed, TransitionMode::Manual, None, now)
            .unwrap();
        assert_eq!(h.status, HypothesisStatus::Proposed);
        assert!(h.blocked_reason.is_none());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let sm = machine();
        let now = Utc::now();
        let mut h = testing_hypothesis(0.5, 0, 0);
        sm.transition(&mut h, HypothesisStatus::Invalidated, TransitionMode::Manual, None, now)
            .unwrap();
        let before = h.clone();

        for to in HypothesisStatus::ALL {
            assert!(sm.transition(&mut h, to, TransitionMode::Manual, Some("x"), now).is_err());
        }
        assert_eq!(h, before);
    }

    #[test]
    fn test_evidence_auto_validates_scenario() {
        let sm = machine();
        let now = Utc::now();
        let mut h = testing_hypothesis(0.5, 5, 3);

        let outcome = sm.add_evidence(&mut h, "strong fill", Some(true), 0.30, now).unwrap();
        assert!((outcome.confidence - 0.80).abs() < 1e-9);
        let effects = outcome.auto_transition.expect("should auto-validate");
        assert_eq!(effects.to, HypothesisStatus::Validated);
        assert_eq!(h.status, HypothesisStatus::Validated);
        assert!(effects.learning.is_some());
    }

    #[test]
    fn test_evidence_high_confidence_without_sample_stays_testing() {
        let sm = machine();
        let mut h = testing_hypothesis(0.5, 2, 2);
        let outcome = sm.add_evidence(&mut h, "nice", Some(true), 0.4, Utc::now()).unwrap();
        assert!(outcome.auto_transition.is_none());
        assert_eq!(h.status, HypothesisStatus::Testing);
    }

    #[test]
    fn test_evidence_auto_invalidates() {
        let sm = machine();
        let mut h = testing_hypothesis(0.4, 0, 0);
        let outcome = sm.add_evidence(&mut h, "blown up", Some(false), -0.2, Utc::now()).unwrap();
        assert_eq!(outcome.auto_transition.map(|e| e.to), Some(HypothesisStatus::Invalidated));
        assert_eq!(h.status, HypothesisStatus::Invalidated);
        assert!(h.conclusion.is_some());
        assert!(h.ended_at.is_some());
    }

    #[test]
    fn test_evidence_rejected_on_inactive() {
        let sm = machine();
        let mut h = testing_hypothesis(0.5, 0, 0);
        h.status = HypothesisStatus::Blocked;
        let err = sm.add_evidence(&mut h, "x", None, 0.1, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::HypothesisNotActive { .. }));
        assert!(h.evidence.is_empty());
    }

    #[test]
    fn test_non_finite_delta_rejected() {
        let sm = machine();
        let mut h = testing_hypothesis(0.5, 0, 0);
        let before = h.clone();
        for delta in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = sm.add_evidence(&mut h, "x", Some(true), delta, Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::ValidationFailed(_)));
        }
        assert_eq!(h, before);

        let outcome = sm.add_evidence(&mut h, "huge", Some(true), 1e300, Utc::now()).unwrap();
        assert_eq!(outcome.confidence, 1.0);
        assert!(h.evidence[0].confidence_delta.is_finite());
    }

    #[test]
    fn test_evaluate_applies_guards() {
        let sm = machine();
        let now = Utc::now();

        let mut weak = testing_hypothesis(0.3, 0, 0);
        let effects = sm.evaluate(&mut weak, now).unwrap().unwrap();
        assert_eq!(effects.to, HypothesisStatus::Invalidated);

        let mut strong = testing_hypothesis(0.6, 5, 4);
        let effects = sm.evaluate(&mut strong, now).unwrap().unwrap();
        assert_eq!(effects.to, HypothesisStatus::Validated);

        let mut middling = testing_hypothesis(0.5, 2, 1);
        assert!(sm.evaluate(&mut middling, now).unwrap().is_none());
    }
}
