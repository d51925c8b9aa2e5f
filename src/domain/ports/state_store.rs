//! Repository port for the shared state store.
//!
//! The store is the single source of truth. Callers re-read what they need
//! at the start of every tick and write back what they changed; nothing is
//! cached across ticks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CriticalFileConfig, EngineStatus, Handoff, HealthRecord, Hypothesis, Learning, PipelineRun,
    Portfolio, Responsibility, ScheduledTask, StateFileStatus, StoreSnapshot, TradeRecord,
};

/// Persistence operations for every collection the engine owns.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load all hypotheses, including concluded ones.
    async fn load_hypotheses(&self) -> DomainResult<Vec<Hypothesis>>;

    /// Replace the hypothesis collection.
    async fn save_hypotheses(&self, hypotheses: &[Hypothesis]) -> DomainResult<()>;

    async fn load_portfolio(&self) -> DomainResult<Portfolio>;

    async fn save_portfolio(&self, portfolio: &Portfolio) -> DomainResult<()>;

    /// Closed-trade log, oldest first.
    async fn load_trades(&self) -> DomainResult<Vec<TradeRecord>>;

    async fn append_trade(&self, trade: &TradeRecord) -> DomainResult<()>;

    async fn load_learnings(&self) -> DomainResult<Vec<Learning>>;

    async fn append_learning(&self, learning: &Learning) -> DomainResult<()>;

    async fn load_handoffs(&self) -> DomainResult<Vec<Handoff>>;

    async fn save_handoffs(&self, handoffs: &[Handoff]) -> DomainResult<()>;

    async fn load_scheduled_tasks(&self) -> DomainResult<Vec<ScheduledTask>>;

    async fn save_scheduled_tasks(&self, tasks: &[ScheduledTask]) -> DomainResult<()>;

    async fn load_responsibilities(&self) -> DomainResult<Vec<Responsibility>>;

    async fn save_responsibilities(&self, responsibilities: &[Responsibility]) -> DomainResult<()>;

    /// Latest health-check record, if one has ever been written.
    async fn load_health(&self) -> DomainResult<Option<HealthRecord>>;

    async fn load_pipeline_runs(&self) -> DomainResult<Vec<PipelineRun>>;

    /// Record a pipeline run. Implementations may drop old runs.
    async fn append_pipeline_run(&self, run: &PipelineRun) -> DomainResult<()>;

    /// Presence and modification time of the given state files.
    async fn state_file_statuses(
        &self,
        files: &[CriticalFileConfig],
    ) -> DomainResult<Vec<StateFileStatus>>;

    async fn load_engine_status(&self) -> DomainResult<Option<EngineStatus>>;

    async fn save_engine_status(&self, status: &EngineStatus) -> DomainResult<()>;

    /// Read everything the detectors need in one pass.
    async fn snapshot(
        &self,
        critical_files: &[CriticalFileConfig],
        now: DateTime<Utc>,
    ) -> DomainResult<StoreSnapshot> {
        Ok(StoreSnapshot {
            taken_at: now,
            hypotheses: self.load_hypotheses().await?,
            portfolio: self.load_portfolio().await?,
            trades: self.load_trades().await?,
            learnings: self.load_learnings().await?,
            health: self.load_health().await?,
            pipeline_runs: self.load_pipeline_runs().await?,
            state_files: self.state_file_statuses(critical_files).await?,
        })
    }
}
