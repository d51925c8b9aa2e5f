//! Hypothesis domain model.
//!
//! A hypothesis is a falsifiable claim about market edge. It carries an
//! append-only evidence log, aggregate trade results, and a confidence
//! score that is re-derived from evidence and always kept in `[0, 1]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Words in a test method that imply it already spells out entry criteria.
const ENTRY_CRITERIA_HINTS: &[&str] = &[
    "enter", "entry", "buy", "sell", "long", "short", "when", "if ", "below", "above",
    "threshold", "cross", "trigger",
];

/// Lifecycle status of a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    /// Recorded but not yet under test
    Proposed,
    /// Actively being tested with trades
    Testing,
    /// Concluded: the edge held up
    Validated,
    /// Concluded: the edge did not hold up
    Invalidated,
    /// Cannot progress until something external is fixed
    Blocked,
}

impl Default for HypothesisStatus {
    fn default() -> Self {
        Self::Proposed
    }
}

impl HypothesisStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 5] = [
        Self::Proposed,
        Self::Testing,
        Self::Validated,
        Self::Invalidated,
        Self::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Testing => "testing",
            Self::Validated => "validated",
            Self::Invalidated => "invalidated",
            Self::Blocked => "blocked",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "proposed" => Some(Self::Proposed),
            "testing" => Some(Self::Testing),
            "validated" => Some(Self::Validated),
            "invalidated" => Some(Self::Invalidated),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Validated and invalidated hypotheses are concluded and retained for audit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Validated | Self::Invalidated)
    }

    /// Only proposed and testing hypotheses accept new evidence.
    pub fn accepts_evidence(&self) -> bool {
        matches!(self, Self::Proposed | Self::Testing)
    }

    /// Target statuses reachable from this status, ignoring guards.
    pub fn valid_transitions(&self) -> Vec<HypothesisStatus> {
        match self {
            Self::Proposed => vec![Self::Testing, Self::Invalidated, Self::Blocked],
            Self::Testing => vec![Self::Validated, Self::Invalidated, Self::Blocked],
            Self::Blocked => vec![Self::Proposed, Self::Testing],
            Self::Validated | Self::Invalidated => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for HypothesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable observation attached to a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub timestamp: DateTime<Utc>,
    pub observation: String,
    /// `Some(true)` supports, `Some(false)` contradicts, `None` is neutral.
    pub support: Option<bool>,
    pub confidence_delta: f64,
    /// Confidence after this evidence was applied.
    pub confidence_after: f64,
}

/// Aggregate results of trades linked to a hypothesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_pnl: f64,
    pub win_rate: f64,
}

impl TestResults {
    /// Record one resolved trade outcome and recompute the win rate.
    pub fn record(&mut self, won: bool, pnl: f64) {
        self.trades += 1;
        if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl += pnl;
        self.win_rate = f64::from(self.wins) / f64::from(self.trades);
    }
}

/// A market a hypothesis is watching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMarket {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,
}

/// A falsifiable claim about market edge under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub statement: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub test_method: String,
    #[serde(default)]
    pub entry_rules: Option<String>,
    #[serde(default)]
    pub exit_rules: Option<String>,

    pub status: HypothesisStatus,
    pub confidence: f64,
    pub initial_confidence: f64,

    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub test_results: TestResults,

    #[serde(default)]
    pub markets: Vec<TrackedMarket>,
    /// Overrides the configured minimum sample size when set.
    #[serde(default)]
    pub min_sample_size: Option<u32>,
    /// Expected average win / average loss, used for the edge estimate.
    #[serde(default)]
    pub expected_payoff: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub blocked_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Hypothesis {
    /// Create a new proposed hypothesis with the given starting confidence.
    pub fn new(
        statement: impl Into<String>,
        rationale: impl Into<String>,
        test_method: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        let confidence = clamp_confidence(confidence);
        Self {
            id: format!("hyp_{}", &Uuid::new_v4().simple().to_string()[..12]),
            statement: statement.into(),
            rationale: rationale.into(),
            test_method: test_method.into(),
            entry_rules: None,
            exit_rules: None,
            status: HypothesisStatus::Proposed,
            confidence,
            initial_confidence: confidence,
            evidence: Vec::new(),
            test_results: TestResults::default(),
            markets: Vec::new(),
            min_sample_size: None,
            expected_payoff: None,
            tags: Vec::new(),
            conclusion: None,
            blocked_reason: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            ended_at: None,
        }
    }

    // Builder methods
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_entry_rules(mut self, rules: impl Into<String>) -> Self {
        self.entry_rules = Some(rules.into());
        self
    }

    pub fn with_exit_rules(mut self, rules: impl Into<String>) -> Self {
        self.exit_rules = Some(rules.into());
        self
    }

    pub fn with_market(mut self, market: TrackedMarket) -> Self {
        self.markets.push(market);
        self
    }

    pub fn with_min_sample_size(mut self, size: u32) -> Self {
        self.min_sample_size = Some(size);
        self
    }

    pub fn with_expected_payoff(mut self, payoff: f64) -> Self {
        self.expected_payoff = Some(payoff);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn has_test_method(&self) -> bool {
        !self.test_method.trim().is_empty()
    }

    /// Explicit entry rules, or a test method that reads like it has them.
    pub fn has_entry_criteria(&self) -> bool {
        if self
            .entry_rules
            .as_deref()
            .is_some_and(|rules| !rules.trim().is_empty())
        {
            return true;
        }
        let method = self.test_method.to_lowercase();
        ENTRY_CRITERIA_HINTS.iter().any(|hint| method.contains(hint))
    }

    /// Effective minimum sample size given the configured default.
    pub fn sample_size(&self, default: u32) -> u32 {
        self.min_sample_size.unwrap_or(default)
    }

    /// Append evidence and re-derive confidence. Returns the new confidence.
    pub fn append_evidence(
        &mut self,
        observation: impl Into<String>,
        support: Option<bool>,
        confidence_delta: f64,
        now: DateTime<Utc>,
    ) -> f64 {
        self.confidence = clamp_confidence(self.confidence + confidence_delta);
        self.evidence.push(Evidence {
            timestamp: now,
            observation: observation.into(),
            support,
            confidence_delta,
            confidence_after: self.confidence,
        });
        self.updated_at = now;
        self.confidence
    }

    /// Record a resolved trade outcome. Leaves confidence and status alone.
    pub fn record_trade(&mut self, won: bool, pnl: f64, now: DateTime<Utc>) {
        self.test_results.record(won, pnl);
        self.updated_at = now;
    }

    /// Confidence after creation and after each evidence entry.
    pub fn confidence_trajectory(&self) -> Vec<f64> {
        std::iter::once(self.initial_confidence)
            .chain(self.evidence.iter().map(|e| e.confidence_after))
            .collect()
    }

    /// Hours since the last update, relative to `now`.
    pub fn hours_since_update(&self, now: DateTime<Utc>) -> f64 {
        (now - self.updated_at).num_seconds() as f64 / 3600.0
    }
}

/// Clamp a confidence value into `[0, 1]`. NaN collapses to 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
