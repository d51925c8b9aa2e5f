//! Read-only view of the store taken at the start of a detection pass.

use chrono::{DateTime, Utc};

use super::health::{HealthRecord, PipelineRun, StateFileStatus};
use super::hypothesis::Hypothesis;
use super::learning::Learning;
use super::portfolio::{Portfolio, TradeRecord};

/// Everything the detectors and ranker read, loaded fresh each tick.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub taken_at: DateTime<Utc>,
    pub hypotheses: Vec<Hypothesis>,
    pub portfolio: Portfolio,
    pub trades: Vec<TradeRecord>,
    pub learnings: Vec<Learning>,
    pub health: Option<HealthRecord>,
    pub pipeline_runs: Vec<PipelineRun>,
    pub state_files: Vec<StateFileStatus>,
}

impl StoreSnapshot {
    /// An empty snapshot at `now`, mostly useful in tests.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            taken_at: now,
            hypotheses: Vec::new(),
            portfolio: Portfolio::default(),
            trades: Vec::new(),
            learnings: Vec::new(),
            health: None,
            pipeline_runs: Vec::new(),
            state_files: Vec::new(),
        }
    }
}
