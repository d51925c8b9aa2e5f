//! Derived engine-status aggregates.
//!
//! Recomputed from the hypothesis collection and persisted on every tick,
//! whatever else the tick goes on to do.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    EngineAggregates, EngineStatus, Hypothesis, HypothesisStatus, PipelineHealth,
    SchedulerConfig,
};
use crate::domain::ports::StateStore;
use crate::services::hypothesis_lifecycle::HypothesisStateMachine;

/// Pure aggregate computation. Same input, same output.
pub fn compute_aggregates(
    hypotheses: &[Hypothesis],
    machine: &HypothesisStateMachine,
    scheduler: &SchedulerConfig,
) -> EngineAggregates {
    let mut counts: BTreeMap<String, usize> = HypothesisStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for h in hypotheses {
        *counts.entry(h.status.as_str().to_string()).or_default() += 1;
    }

    let mut testable: Vec<String> = hypotheses
        .iter()
        .filter(|h| machine.is_testable(h))
        .map(|h| h.id.clone())
        .collect();
    testable.sort();

    let health = if testable.len() < scheduler.starved_below {
        PipelineHealth::Starved
    } else if testable.len() > scheduler.saturated_above {
        PipelineHealth::Saturated
    } else {
        PipelineHealth::Healthy
    };

    EngineAggregates {
        counts,
        total: hypotheses.len(),
        testable,
        health,
    }
}

pub struct EngineStatusService<S: StateStore + ?Sized> {
    store: Arc<S>,
    machine: HypothesisStateMachine,
    scheduler: SchedulerConfig,
}

impl<S: StateStore + ?Sized> EngineStatusService<S> {
    pub fn new(store: Arc<S>, machine: HypothesisStateMachine, scheduler: SchedulerConfig) -> Self {
        Self {
            store,
            machine,
            scheduler,
        }
    }

    /// Recompute from the store and persist.
    pub async fn refresh(&self, now: DateTime<Utc>) -> DomainResult<EngineStatus> {
        let hypotheses = self.store.load_hypotheses().await?;
        let status = EngineStatus {
            aggregates: compute_aggregates(&hypotheses, &self.machine, &self.scheduler),
            computed_at: now,
        };
        self.store.save_engine_status(&status).await?;
        tracing::debug!(
            total = status.aggregates.total,
            testable = status.aggregates.testable.len(),
            health = %status.aggregates.health,
            "Engine status refreshed"
        );
        Ok(status)
    }
}
