//! In-memory state store for tests and dry runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CriticalFileConfig, EngineStatus, Handoff, HealthRecord, Hypothesis, Learning, PipelineRun,
    Portfolio, Responsibility, ScheduledTask, StateFileStatus, TradeRecord,
};
use crate::domain::ports::StateStore;

#[derive(Debug, Default, Clone)]
struct Collections {
    hypotheses: Vec<Hypothesis>,
    portfolio: Portfolio,
    trades: Vec<TradeRecord>,
    learnings: Vec<Learning>,
    handoffs: Vec<Handoff>,
    tasks: Vec<ScheduledTask>,
    responsibilities: Vec<Responsibility>,
    health: Option<HealthRecord>,
    pipeline_runs: Vec<PipelineRun>,
    state_files: Vec<StateFileStatus>,
    engine_status: Option<EngineStatus>,
}

/// A [`StateStore`] that keeps every collection in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the hypothesis collection.
    pub async fn with_hypotheses(self, hypotheses: Vec<Hypothesis>) -> Self {
        self.inner.write().await.hypotheses = hypotheses;
        self
    }

    pub async fn with_portfolio(self, portfolio: Portfolio) -> Self {
        self.inner.write().await.portfolio = portfolio;
        self
    }

    pub async fn set_health(&self, health: Option<HealthRecord>) {
        self.inner.write().await.health = health;
    }

    /// Pretend the given state files exist with these modification times.
    ///
    /// Files named in a lookup but absent here are reported as missing.
    pub async fn set_state_file(&self, name: &str, modified_at: Option<DateTime<Utc>>) {
        let mut inner = self.inner.write().await;
        inner.state_files.retain(|f| f.name != name);
        inner.state_files.push(StateFileStatus {
            name: name.to_string(),
            exists: modified_at.is_some(),
            modified_at,
            stale_after_hours: 0.0,
        });
    }

    pub async fn trades(&self) -> Vec<TradeRecord> {
        self.inner.read().await.trades.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_hypotheses(&self) -> DomainResult<Vec<Hypothesis>> {
        Ok(self.inner.read().await.hypotheses.clone())
    }

    async fn save_hypotheses(&self, hypotheses: &[Hypothesis]) -> DomainResult<()> {
        self.inner.write().await.hypotheses = hypotheses.to_vec();
        Ok(())
    }

    async fn load_portfolio(&self) -> DomainResult<Portfolio> {
        Ok(self.inner.read().await.portfolio.clone())
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> DomainResult<()> {
        self.inner.write().await.portfolio = portfolio.clone();
        Ok(())
    }

    async fn load_trades(&self) -> DomainResult<Vec<TradeRecord>> {
        Ok(self.inner.read().await.trades.clone())
    }

    async fn append_trade(&self, trade: &TradeRecord) -> DomainResult<()> {
        self.inner.write().await.trades.push(trade.clone());
        Ok(())
    }

    async fn load_learnings(&self) -> DomainResult<Vec<Learning>> {
        Ok(self.inner.read().await.learnings.clone())
    }

    async fn append_learning(&self, learning: &Learning) -> DomainResult<()> {
        self.inner.write().await.learnings.push(learning.clone());
        Ok(())
    }

    async fn load_handoffs(&self) -> DomainResult<Vec<Handoff>> {
        Ok(self.inner.read().await.handoffs.clone())
    }

    async fn save_handoffs(&self, handoffs: &[Handoff]) -> DomainResult<()> {
        self.inner.write().await.handoffs = handoffs.to_vec();
        Ok(())
    }

    async fn load_scheduled_tasks(&self) -> DomainResult<Vec<ScheduledTask>> {
        Ok(self.inner.read().await.tasks.clone())
    }

    async fn save_scheduled_tasks(&self, tasks: &[ScheduledTask]) -> DomainResult<()> {
        self.inner.write().await.tasks = tasks.to_vec();
        Ok(())
    }

    async fn load_responsibilities(&self) -> DomainResult<Vec<Responsibility>> {
        Ok(self.inner.read().await.responsibilities.clone())
    }

    async fn save_responsibilities(&self, responsibilities: &[Responsibility]) -> DomainResult<()> {
        self.inner.write().await.responsibilities = responsibilities.to_vec();
        Ok(())
    }

    async fn load_health(&self) -> DomainResult<Option<HealthRecord>> {
        Ok(self.inner.read().await.health.clone())
    }

    async fn load_pipeline_runs(&self) -> DomainResult<Vec<PipelineRun>> {
        Ok(self.inner.read().await.pipeline_runs.clone())
    }

    async fn append_pipeline_run(&self, run: &PipelineRun) -> DomainResult<()> {
        self.inner.write().await.pipeline_runs.push(run.clone());
        Ok(())
    }

    async fn state_file_statuses(
        &self,
        files: &[CriticalFileConfig],
    ) -> DomainResult<Vec<StateFileStatus>> {
        let inner = self.inner.read().await;
        Ok(files
            .iter()
            .map(|file| {
                let known = inner.state_files.iter().find(|s| s.name == file.name);
                StateFileStatus {
                    name: file.name.clone(),
                    exists: known.is_some_and(|s| s.exists),
                    modified_at: known.and_then(|s| s.modified_at),
                    stale_after_hours: file.stale_hours,
                }
            })
            .collect())
    }

    async fn load_engine_status(&self) -> DomainResult<Option<EngineStatus>> {
        Ok(self.inner.read().await.engine_status.clone())
    }

    async fn save_engine_status(&self, status: &EngineStatus) -> DomainResult<()> {
        self.inner.write().await.engine_status = Some(status.clone());
        Ok(())
    }
}
