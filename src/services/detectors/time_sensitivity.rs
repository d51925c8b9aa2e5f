//! Time sensitivity: tracked markets closing soon.

use crate::domain::models::{
    Priority, PriorityAction, PriorityContext, PriorityType, StoreSnapshot, TimeSensitivityConfig,
};
use crate::services::prompts::priority_instructions;

use super::{hours_between, SignalDetector};

pub const URGENCY_URGENT: u8 = 90;
pub const URGENCY_SOON: u8 = 70;

pub struct TimeSensitivityDetector {
    config: TimeSensitivityConfig,
}

impl TimeSensitivityDetector {
    pub fn new(config: TimeSensitivityConfig) -> Self {
        Self { config }
    }

    fn urgency_for(&self, hours_to_close: f64) -> Option<u8> {
        if hours_to_close <= 0.0 {
            None
        } else if hours_to_close <= self.config.urgent_hours {
            Some(URGENCY_URGENT)
        } else if hours_to_close <= self.config.soon_hours {
            Some(URGENCY_SOON)
        } else {
            None
        }
    }
}

impl SignalDetector for TimeSensitivityDetector {
    fn priority_type(&self) -> PriorityType {
        PriorityType::TimeSensitive
    }

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        let now = snapshot.taken_at;
        let mut out = Vec::new();

        for hypothesis in snapshot
            .hypotheses
            .iter()
            .filter(|h| h.status.accepts_evidence())
        {
            for market in &hypothesis.markets {
                let Some(close_time) = market.close_time else {
                    continue;
                };
                let hours_to_close = hours_between(now, close_time);
                let Some(urgency) = self.urgency_for(hours_to_close) else {
                    continue;
                };

                let summary = format!(
                    "{} closes in {hours_to_close:.1}h ({})",
                    market.id, hypothesis.id
                );
                let context = PriorityContext::MarketClose {
                    hypothesis_id: hypothesis.id.clone(),
                    market_id: market.id.clone(),
                    question: market.question.clone(),
                    hours_to_close,
                };
                let instructions =
                    priority_instructions(PriorityAction::ReviewMarketClose, &summary, &context);
                out.push(Priority::for_worker(
                    PriorityType::TimeSensitive,
                    urgency,
                    PriorityAction::ReviewMarketClose,
                    summary,
                    context,
                    instructions,
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Hypothesis, HypothesisStatus, TrackedMarket};
    use chrono::{Duration, Utc};

    fn market(id: &str, hours: i64) -> TrackedMarket {
        TrackedMarket {
            id: id.to_string(),
            question: format!("Will {id} happen?"),
            close_time: Some(Utc::now() + Duration::hours(hours)),
        }
    }

    #[test]
    fn test_urgency_windows() {
        let h = Hypothesis::new("s", "r", "m", 0.5)
            .with_market(market("urgent", 3))
            .with_market(market("soon", 12))
            .with_market(market("later", 48))
            .with_market(market("closed", -1))
            .with_market(TrackedMarket {
                id: "open-ended".to_string(),
                question: String::new(),
                close_time: None,
            });
        let mut snapshot = StoreSnapshot::empty(Utc::now());
        snapshot.hypotheses = vec![h];

        let out = TimeSensitivityDetector::new(TimeSensitivityConfig::default()).detect(&snapshot);
        let urgencies: Vec<u8> = out.iter().map(|p| p.urgency).collect();
        assert_eq!(urgencies, vec![90, 70]);
        assert!(out.iter().all(|p| p.requires_worker));
    }

    #[test]
    fn test_concluded_hypotheses_ignored() {
        let mut h = Hypothesis::new("s", "r", "m", 0.5).with_market(market("urgent", 2));
        h.status = HypothesisStatus::Validated;
        let mut snapshot = StoreSnapshot::empty(Utc::now());
        snapshot.hypotheses = vec![h];
        let out = TimeSensitivityDetector::new(TimeSensitivityConfig::default()).detect(&snapshot);
        assert!(out.is_empty());
    }
}
