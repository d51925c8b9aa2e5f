//! Derived engine-status aggregates, recomputed and persisted every tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How much testable work the engine has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineHealth {
    Starved,
    Healthy,
    Saturated,
}

impl PipelineHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starved => "starved",
            Self::Healthy => "healthy",
            Self::Saturated => "saturated",
        }
    }
}

impl fmt::Display for PipelineHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The deterministic part of the engine status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineAggregates {
    /// Hypothesis count per status name, including zero counts.
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
    /// Ids of hypotheses that can be tested right now, sorted.
    pub testable: Vec<String>,
    pub health: PipelineHealth,
}

/// Persisted engine status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    #[serde(flatten)]
    pub aggregates: EngineAggregates,
    pub computed_at: DateTime<Utc>,
}
