//! Executor ports.
//!
//! Three kinds of executor carry out the one unit of work a tick selects:
//! deterministic in-process code actions, named external pipelines, and
//! the external reasoning worker.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    PipelineOutcome, Priority, PriorityAction, WorkerOutcome, WorkerRequest,
};

/// Executes deterministic actions in-process.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Whether this executor knows how to run `action`.
    fn supports(&self, action: PriorityAction) -> bool;

    /// Run the priority's action against the store. Returns `Ok(true)` on
    /// success. Must be idempotent against already-applied actions.
    async fn execute(&self, priority: &Priority) -> DomainResult<bool>;
}

/// Hands a focused prompt to an external reasoning process and waits for
/// it to exit.
///
/// No timeout is imposed by the scheduler: a worker that never exits blocks
/// every later tick until it does.
#[async_trait]
pub trait WorkerExecutor: Send + Sync {
    /// Executor name for logs.
    fn name(&self) -> &'static str;

    /// Run the request to completion.
    async fn execute(&self, request: WorkerRequest) -> DomainResult<WorkerOutcome>;
}

/// Runs registered external pipelines by name.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    fn is_registered(&self, pipeline: &str) -> bool;

    /// Run the pipeline to completion. Output is opaque to the scheduler.
    async fn run(&self, pipeline: &str) -> DomainResult<PipelineOutcome>;
}
