//! Ranks hypotheses by "what to work on next".
//!
//! This is independent of the scheduler's urgency ranking. Each hypothesis
//! gets five sub-scores in `[0, 1]` combined with fixed weights:
//!
//! | component        | weight |
//! |------------------|--------|
//! | confidence       | 0.30   |
//! | learning support | 0.20   |
//! | time sensitivity | 0.20   |
//! | not blocked      | 0.15   |
//! | edge estimate    | 0.15   |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::models::{extract_keywords, Hypothesis, HypothesisStatus, Learning};

const WEIGHT_CONFIDENCE: f64 = 0.30;
const WEIGHT_LEARNINGS: f64 = 0.20;
const WEIGHT_TIME: f64 = 0.20;
const WEIGHT_NOT_BLOCKED: f64 = 0.15;
const WEIGHT_EDGE: f64 = 0.15;

/// Support contributed by each related learning.
const LEARNING_STEP: f64 = 0.05;
/// Bound on net learning support before normalization.
const LEARNING_BOUND: f64 = 0.2;
/// Shared keywords needed before a learning counts as related.
const MIN_SHARED_KEYWORDS: usize = 2;

/// Strong signals that a hypothesis is about something about to happen.
const URGENT_TERMS: &[&str] = &[
    "today", "tonight", "hours", "hourly", "expire", "expires", "expiring", "expiry",
    "deadline", "imminent", "closing", "resolves", "resolution", "final",
];
/// Weaker signals: near-term but not immediate.
const SOON_TERMS: &[&str] = &[
    "week", "weekly", "tomorrow", "soon", "upcoming", "before", "event", "debate", "announcement",
];

/// Weighted score with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisScore {
    pub hypothesis_id: String,
    pub statement: String,
    pub status: HypothesisStatus,
    pub total: f64,
    pub confidence: f64,
    pub learning_support: f64,
    pub time_sensitivity: f64,
    pub not_blocked: f64,
    pub edge: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HypothesisRanker;

impl HypothesisRanker {
    pub fn new() -> Self {
        Self
    }

    /// Score every non-terminal hypothesis, best first.
    ///
    /// Equal totals keep their input order.
    pub fn rank(&self, hypotheses: &[Hypothesis], learnings: &[Learning]) -> Vec<HypothesisScore> {
        let mut scores: Vec<HypothesisScore> = hypotheses
            .iter()
            .filter(|h| !h.status.is_terminal())
            .map(|h| self.score(h, learnings))
            .collect();
        scores.sort_by(|a, b| b.total.total_cmp(&a.total));
        scores
    }

    pub fn score(&self, hypothesis: &Hypothesis, learnings: &[Learning]) -> HypothesisScore {
        let confidence = hypothesis.confidence;
        let learning_support = learning_support(hypothesis, learnings);
        let time_sensitivity = time_sensitivity(hypothesis);
        let not_blocked = if hypothesis.status == HypothesisStatus::Blocked {
            0.0
        } else {
            1.0
        };
        let edge = edge_score(hypothesis);

        let total = WEIGHT_CONFIDENCE * confidence
            + WEIGHT_LEARNINGS * learning_support
            + WEIGHT_TIME * time_sensitivity
            + WEIGHT_NOT_BLOCKED * not_blocked
            + WEIGHT_EDGE * edge;

        HypothesisScore {
            hypothesis_id: hypothesis.id.clone(),
            statement: hypothesis.statement.clone(),
            status: hypothesis.status,
            total,
            confidence,
            learning_support,
            time_sensitivity,
            not_blocked,
            edge,
        }
    }
}

/// Net support from concluded hypotheses that share keywords, mapped to `[0, 1]`.
///
/// 0.5 means no related learnings or a perfect split.
fn learning_support(hypothesis: &Hypothesis, learnings: &[Learning]) -> f64 {
    let keywords = extract_keywords(&format!("{} {}", hypothesis.statement, hypothesis.test_method));
    let net: f64 = learnings
        .iter()
        .filter(|l| l.hypothesis_id != hypothesis.id)
        .filter(|l| {
            let theirs: BTreeSet<&str> = l.keywords.iter().map(String::as_str).collect();
            keywords.iter().filter(|k| theirs.contains(k.as_str())).count() >= MIN_SHARED_KEYWORDS
        })
        .map(|l| match l.outcome {
            HypothesisStatus::Validated => LEARNING_STEP,
            HypothesisStatus::Invalidated => -LEARNING_STEP,
            _ => 0.0,
        })
        .sum();
    let net = net.clamp(-LEARNING_BOUND, LEARNING_BOUND);
    (net + LEARNING_BOUND) / (2.0 * LEARNING_BOUND)
}

fn time_sensitivity(hypothesis: &Hypothesis) -> f64 {
    let text = format!("{} {}", hypothesis.statement, hypothesis.test_method).to_lowercase();
    let words: BTreeSet<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if URGENT_TERMS.iter().any(|t| words.contains(t)) {
        1.0
    } else if SOON_TERMS.iter().any(|t| words.contains(t)) {
        0.5
    } else {
        0.0
    }
}

/// Kelly-style edge: `p - (1 - p) / b`, floored at zero and doubled.
///
/// `p` is the observed win rate once any trades exist, otherwise the
/// confidence. `b` is the expected payoff ratio, 1.0 when unknown.
fn edge_score(hypothesis: &Hypothesis) -> f64 {
    let p = if hypothesis.test_results.trades > 0 {
        hypothesis.test_results.win_rate
    } else {
        hypothesis.confidence
    };
    let b = hypothesis
        .expected_payoff
        .filter(|b| *b > 0.0)
        .unwrap_or(1.0);
    let kelly = p - (1.0 - p) / b;
    (kelly.max(0.0) * 2.0).min(1.0)
}
