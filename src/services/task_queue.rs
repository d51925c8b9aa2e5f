//! Time-and-priority ordered queue of scheduled tasks.
//!
//! Failed tasks are retried by simply staying in the queue. The
//! [`RetryPolicy`] is unbounded with no backoff, so a task that always fails
//! is picked up again on every tick where nothing outranks it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    next_run_after, PipelineConfig, RetryPolicy, ScheduledTask, TaskContext,
};
use crate::domain::ports::StateStore;

/// Earliest-due task; equal due times go to the higher tier, then list order.
pub fn select_next_due(tasks: &[ScheduledTask], now: DateTime<Utc>) -> Option<&ScheduledTask> {
    tasks.iter().filter(|t| t.is_due(now)).min_by(|a, b| {
        a.scheduled_for
            .cmp(&b.scheduled_for)
            .then(b.priority.cmp(&a.priority))
    })
}

/// Tasks for configured pipelines that have nothing queued.
///
/// Any queued task for a pipeline counts, due or not, so running this twice
/// never duplicates.
pub fn missing_pipeline_tasks(
    tasks: &[ScheduledTask],
    pipelines: &[PipelineConfig],
    now: DateTime<Utc>,
    default_frequency: &str,
) -> Vec<ScheduledTask> {
    pipelines
        .iter()
        .filter(|p| {
            !tasks
                .iter()
                .any(|t| t.context.pipeline_name() == Some(p.name.as_str()))
        })
        .map(|p| {
            ScheduledTask::new(
                format!("Run pipeline {}", p.name),
                next_run_after(now, &p.frequency, default_frequency),
                p.priority,
                TaskContext::Pipeline {
                    pipeline: p.name.clone(),
                },
            )
            .recurring(&p.frequency)
        })
        .collect()
}

pub struct TaskQueue<S: StateStore + ?Sized> {
    store: Arc<S>,
    default_frequency: String,
    retry_policy: RetryPolicy,
}

impl<S: StateStore + ?Sized> TaskQueue<S> {
    pub fn new(store: Arc<S>, default_frequency: impl Into<String>) -> Self {
        Self {
            store,
            default_frequency: default_frequency.into(),
            retry_policy: RetryPolicy::unbounded(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub async fn add(&self, task: ScheduledTask) -> DomainResult<ScheduledTask> {
        if task.description.trim().is_empty() {
            return Err(DomainError::MissingField("description".to_string()));
        }
        if let TaskContext::Pipeline { pipeline } = &task.context {
            if pipeline.trim().is_empty() {
                return Err(DomainError::MissingField("pipeline".to_string()));
            }
        }

        let mut all = self.store.load_scheduled_tasks().await?;
        all.push(task.clone());
        self.store.save_scheduled_tasks(&all).await?;
        tracing::info!(
            task_id = %task.id,
            task_type = task.task_type(),
            scheduled_for = %task.scheduled_for,
            "Task scheduled"
        );
        Ok(task)
    }

    /// Queue ordered by due time, then tier.
    pub async fn list(&self) -> DomainResult<Vec<ScheduledTask>> {
        let mut all = self.store.load_scheduled_tasks().await?;
        all.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(b.priority.cmp(&a.priority))
        });
        Ok(all)
    }

    /// Make sure every configured recurring pipeline has a queued task.
    ///
    /// Returns the tasks that were inserted.
    pub async fn heal_recurring(
        &self,
        pipelines: &[PipelineConfig],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<ScheduledTask>> {
        let mut all = self.store.load_scheduled_tasks().await?;
        let missing = missing_pipeline_tasks(&all, pipelines, now, &self.default_frequency);
        if missing.is_empty() {
            return Ok(missing);
        }
        for task in &missing {
            tracing::info!(
                task_id = %task.id,
                pipeline = task.context.pipeline_name().unwrap_or_default(),
                scheduled_for = %task.scheduled_for,
                "Self-healing: queued missing pipeline run"
            );
        }
        all.extend(missing.iter().cloned());
        self.store.save_scheduled_tasks(&all).await?;
        Ok(missing)
    }

    pub async fn next_due(&self, now: DateTime<Utc>) -> DomainResult<Option<ScheduledTask>> {
        let all = self.store.load_scheduled_tasks().await?;
        Ok(select_next_due(&all, now).cloned())
    }

    /// Remove a finished task. A recurring task is replaced by its next
    /// occurrence at `now + frequency`, which is returned.
    pub async fn complete(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<ScheduledTask>> {
        let mut all = self.store.load_scheduled_tasks().await?;
        let idx = all
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        let done = all.remove(idx);

        let next = done.recurrence.as_ref().map(|r| {
            done.next_occurrence(next_run_after(now, &r.frequency, &self.default_frequency))
        });
        if let Some(next) = &next {
            all.push(next.clone());
        }
        self.store.save_scheduled_tasks(&all).await?;
        tracing::debug!(
            task_id = %id,
            next_id = next.as_ref().map(|t| t.id.as_str()).unwrap_or_default(),
            "Task completed"
        );
        Ok(next)
    }

    /// Record a failed attempt. The task stays queued while the retry policy
    /// allows it.
    pub async fn record_failure(&self, id: &str, error: &str) -> DomainResult<ScheduledTask> {
        let mut all = self.store.load_scheduled_tasks().await?;
        let idx = all
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;

        all[idx].attempts += 1;
        all[idx].last_error = Some(error.to_string());
        let task = all[idx].clone();

        if self.retry_policy.should_retry(task.attempts) {
            tracing::warn!(
                task_id = %id,
                attempts = task.attempts,
                error,
                "Task failed, left queued for retry"
            );
        } else {
            tracing::error!(
                task_id = %id,
                attempts = task.attempts,
                error,
                "Task failed and exhausted its retries, dropping"
            );
            all.remove(idx);
        }
        self.store.save_scheduled_tasks(&all).await?;
        Ok(task)
    }
}
