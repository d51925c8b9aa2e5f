//! Priority decision engine.
//!
//! Concatenates all detector output, ranks it, and decides whether the top
//! candidate preempts normal scheduling:
//!
//! - urgency above `high_urgency` (70): override
//! - urgency in `[medium_urgency, high_urgency]` (50-70): override as well;
//!   there is no debounce or recency tracking for this tier
//! - anything lower, or no candidates: no override
//!
//! Equal urgencies are ordered by
//! [`PriorityType`](crate::domain::models::PriorityType) declaration order,
//! then by the order a detector emitted them.

use crate::domain::models::{Config, Priority, PriorityDecision, SchedulerConfig, StoreSnapshot};
use crate::services::detectors::{default_detectors, SignalDetector};

pub struct PriorityEngine {
    detectors: Vec<Box<dyn SignalDetector>>,
    high_urgency: u8,
    medium_urgency: u8,
}

impl PriorityEngine {
    pub fn new(detectors: Vec<Box<dyn SignalDetector>>, scheduler: &SchedulerConfig) -> Self {
        Self {
            detectors,
            high_urgency: scheduler.high_urgency,
            medium_urgency: scheduler.medium_urgency,
        }
    }

    /// Engine with the five standard detectors.
    pub fn from_config(config: &Config) -> Self {
        Self::new(default_detectors(&config.detectors), &config.scheduler)
    }

    /// Run every detector in registration order.
    pub fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        self.detectors
            .iter()
            .flat_map(|d| {
                let found = d.detect(snapshot);
                if !found.is_empty() {
                    tracing::debug!(
                        detector = d.priority_type().as_str(),
                        count = found.len(),
                        "Detector fired"
                    );
                }
                found
            })
            .collect()
    }

    /// Detect and decide in one step.
    pub fn evaluate(&self, snapshot: &StoreSnapshot) -> PriorityDecision {
        self.decide(self.detect(snapshot))
    }

    /// Rank candidates and apply the override rule.
    pub fn decide(&self, mut candidates: Vec<Priority>) -> PriorityDecision {
        candidates.sort_by(|a, b| {
            b.urgency
                .cmp(&a.urgency)
                .then(a.priority_type.cmp(&b.priority_type))
        });

        let Some(top) = candidates.first() else {
            return PriorityDecision::none();
        };

        let tier = if top.urgency > self.high_urgency {
            "high"
        } else if top.urgency >= self.medium_urgency {
            "medium"
        } else {
            "low"
        };
        let should_override = tier != "low";
        tracing::debug!(
            urgency = top.urgency,
            action = top.action.as_str(),
            tier,
            should_override,
            "Priority decision"
        );

        PriorityDecision {
            should_override,
            selected: should_override.then(|| top.clone()),
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PriorityAction, PriorityContext, PriorityType};

    fn priority(priority_type: PriorityType, urgency: u8) -> Priority {
        Priority::for_code(
            priority_type,
            urgency,
            PriorityAction::RefreshHealthCheck,
            format!("{priority_type} {urgency}"),
            PriorityContext::HealthStale { age_hours: 7.0 },
        )
    }

    fn engine() -> PriorityEngine {
        PriorityEngine::new(Vec::new(), &SchedulerConfig::default())
    }

    #[test]
    fn test_high_urgency_overrides() {
        let decision = engine().decide(vec![
            priority(PriorityType::StuckHypothesis, 60),
            priority(PriorityType::PortfolioRisk, 95),
        ]);
        assert!(decision.should_override);
        assert_eq!(decision.selected.map(|p| p.urgency), Some(95));
        assert_eq!(decision.candidates.len(), 2);
    }

    #[test]
    fn test_low_urgency_does_not_override() {
        let decision = engine().decide(vec![
            priority(PriorityType::SystemHealth, 40),
            priority(PriorityType::ExecutionVelocity, 30),
        ]);
        assert!(!decision.should_override);
        assert!(decision.selected.is_none());
        assert_eq!(decision.candidates[0].urgency, 40);
    }

    #[test]
    fn test_medium_tier_boundaries_override() {
        for urgency in [50, 70] {
            let decision = engine().decide(vec![priority(PriorityType::SystemHealth, urgency)]);
            assert!(decision.should_override, "urgency {urgency}");
        }
        let decision = engine().decide(vec![priority(PriorityType::SystemHealth, 49)]);
        assert!(!decision.should_override);
    }

    #[test]
    fn test_empty_means_no_override() {
        let decision = engine().decide(Vec::new());
        assert_eq!(decision, PriorityDecision::none());
    }

    #[test]
    fn test_ties_follow_type_order() {
        let decision = engine().decide(vec![
            priority(PriorityType::SystemHealth, 70),
            priority(PriorityType::ExecutionVelocity, 70),
            priority(PriorityType::TimeSensitive, 70),
        ]);
        let types: Vec<_> = decision.candidates.iter().map(|p| p.priority_type).collect();
        assert_eq!(
            types,
            vec![
                PriorityType::TimeSensitive,
                PriorityType::ExecutionVelocity,
                PriorityType::SystemHealth
            ]
        );
    }
}
