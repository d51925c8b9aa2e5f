//! Stuck hypotheses: stale proposals and low-confidence tests.

use crate::domain::models::{
    Hypothesis, HypothesisStatus, Priority, PriorityAction, PriorityContext, PriorityType,
    StoreSnapshot, StuckHypothesisConfig,
};
use crate::services::prompts::priority_instructions;

use super::SignalDetector;

pub const URGENCY_STALE_PROPOSED: u8 = 60;
pub const URGENCY_LOW_CONFIDENCE: u8 = 65;

pub struct StuckHypothesesDetector {
    config: StuckHypothesisConfig,
}

impl StuckHypothesesDetector {
    pub fn new(config: StuckHypothesisConfig) -> Self {
        Self { config }
    }

    fn classify(&self, hypothesis: &Hypothesis, hours: f64) -> Option<(u8, PriorityAction, String)> {
        match hypothesis.status {
            HypothesisStatus::Proposed if hours > self.config.proposed_stale_hours => Some((
                URGENCY_STALE_PROPOSED,
                PriorityAction::AdvanceProposedHypothesis,
                format!("{} proposed for {hours:.0}h without progress", hypothesis.id),
            )),
            HypothesisStatus::Testing if hypothesis.confidence < self.config.low_confidence => {
                Some((
                    URGENCY_LOW_CONFIDENCE,
                    PriorityAction::RescueLowConfidence,
                    format!(
                        "{} testing at confidence {:.2}",
                        hypothesis.id, hypothesis.confidence
                    ),
                ))
            }
            _ => None,
        }
    }
}

impl SignalDetector for StuckHypothesesDetector {
    fn priority_type(&self) -> PriorityType {
        PriorityType::StuckHypothesis
    }

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        snapshot
            .hypotheses
            .iter()
            .filter_map(|h| {
                let hours = h.hours_since_update(snapshot.taken_at);
                let (urgency, action, summary) = self.classify(h, hours)?;
                let context = PriorityContext::StuckHypothesis {
                    hypothesis_id: h.id.clone(),
                    status: h.status.to_string(),
                    hours_since_update: hours,
                    confidence: h.confidence,
                };
                let instructions = priority_instructions(action, &summary, &context);
                Some(Priority::for_worker(
                    PriorityType::StuckHypothesis,
                    urgency,
                    action,
                    summary,
                    context,
                    instructions,
                ))
            })
            .collect()
    }
}
