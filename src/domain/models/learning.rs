//! Learning records extracted from concluded hypotheses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::hypothesis::{Hypothesis, HypothesisStatus, TestResults};

/// Words too common to be useful when matching learnings to hypotheses.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "when", "will", "than", "then",
    "into", "over", "under", "have", "has", "are", "was", "were", "our", "their", "its",
    "more", "less", "most", "least", "about", "after", "before",
];

/// Summary of a concluded hypothesis, retained for future ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub id: String,
    pub hypothesis_id: String,
    pub statement: String,
    /// Either `validated` or `invalidated`.
    pub outcome: HypothesisStatus,
    pub conclusion: String,
    pub evidence_count: usize,
    pub supporting: usize,
    pub contradicting: usize,
    pub neutral: usize,
    pub initial_confidence: f64,
    pub final_confidence: f64,
    pub confidence_trajectory: Vec<f64>,
    pub test_results: TestResults,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Learning {
    /// Summarize a hypothesis that just reached a terminal status.
    pub fn from_hypothesis(hypothesis: &Hypothesis, now: DateTime<Utc>) -> Self {
        let supporting = hypothesis
            .evidence
            .iter()
            .filter(|e| e.support == Some(true))
            .count();
        let contradicting = hypothesis
            .evidence
            .iter()
            .filter(|e| e.support == Some(false))
            .count();
        let neutral = hypothesis.evidence.len() - supporting - contradicting;

        Self {
            id: format!("learn_{}", &Uuid::new_v4().simple().to_string()[..12]),
            hypothesis_id: hypothesis.id.clone(),
            statement: hypothesis.statement.clone(),
            outcome: hypothesis.status,
            conclusion: hypothesis.conclusion.clone().unwrap_or_default(),
            evidence_count: hypothesis.evidence.len(),
            supporting,
            contradicting,
            neutral,
            initial_confidence: hypothesis.initial_confidence,
            final_confidence: hypothesis.confidence,
            confidence_trajectory: hypothesis.confidence_trajectory(),
            test_results: hypothesis.test_results.clone(),
            keywords: extract_keywords(&format!(
                "{} {}",
                hypothesis.statement, hypothesis.test_method
            ))
            .into_iter()
            .collect(),
            created_at: now,
        }
    }
}

/// Lowercased words of four or more letters, minus stopwords.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() >= 4 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        let words = extract_keywords("The election markets overreact after debates!");
        assert!(words.contains("election"));
        assert!(words.contains("overreact"));
        assert!(words.contains("debates"));
        assert!(!words.contains("the"));
        assert!(!words.contains("after"));
    }

    #[test]
    fn test_learning_counts_support() {
        let now = Utc::now();
        let mut h = Hypothesis::new("Weather markets drift", "r", "m", 0.5);
        h.append_evidence("up", Some(true), 0.1, now);
        h.append_evidence("down", Some(false), -0.05, now);
        h.append_evidence("meh", None, 0.0, now);
        h.status = HypothesisStatus::Validated;
        h.conclusion = Some("held".to_string());

        let learning = Learning::from_hypothesis(&h, now);
        assert_eq!(learning.evidence_count, 3);
        assert_eq!(learning.supporting, 1);
        assert_eq!(learning.contradicting, 1);
        assert_eq!(learning.neutral, 1);
        assert_eq!(learning.outcome, HypothesisStatus::Validated);
        assert_eq!(learning.confidence_trajectory.len(), 4);
        assert!(learning.keywords.contains(&"weather".to_string()));
    }
}
