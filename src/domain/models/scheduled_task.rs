//! Calendar-scheduled task domain model.
//!
//! Scheduled tasks are one-off or recurring units of work ordered by due
//! time and then by priority tier. Recurring tasks are regenerated under a
//! fresh id after each successful run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::tier::PriorityTier;

/// What a scheduled task runs, with its type-specific context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskContext {
    /// Run a registered pipeline through the pipeline executor.
    Pipeline { pipeline: String },
    /// Hand focused instructions to the reasoning worker under a role.
    Worker {
        role: String,
        instructions: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hypothesis_id: Option<String>,
    },
}

impl TaskContext {
    pub fn task_type(&self) -> &'static str {
        match self {
            Self::Pipeline { .. } => "pipeline",
            Self::Worker { .. } => "worker",
        }
    }

    pub fn pipeline_name(&self) -> Option<&str> {
        match self {
            Self::Pipeline { pipeline } => Some(pipeline),
            Self::Worker { .. } => None,
        }
    }
}

/// Recurrence settings for a task that repeats after each success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Frequency string such as `12h`.
    pub frequency: String,
}

/// Backoff between retries of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Retry on the very next tick.
    None,
}

/// Retry policy for failed scheduled tasks.
///
/// A failed task stays in the queue and is picked up again on a later
/// tick. The default policy has no attempt ceiling and no backoff, so a
/// permanently failing task keeps being selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// `None` means unbounded.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RetryPolicy {
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: Backoff::None,
        }
    }

    /// Whether a task that has failed `attempts` times stays queued.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// A queued task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub priority: PriorityTier,
    pub context: TaskContext,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(
        description: impl Into<String>,
        scheduled_for: DateTime<Utc>,
        priority: PriorityTier,
        context: TaskContext,
    ) -> Self {
        Self {
            id: new_task_id(),
            description: description.into(),
            scheduled_for,
            priority,
            context,
            recurrence: None,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    pub fn recurring(mut self, frequency: impl Into<String>) -> Self {
        self.recurrence = Some(Recurrence {
            frequency: frequency.into(),
        });
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for <= now
    }

    pub fn task_type(&self) -> &'static str {
        self.context.task_type()
    }

    /// The next occurrence of a recurring task, under a fresh id.
    pub fn next_occurrence(&self, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id: new_task_id(),
            scheduled_for,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.description, self.task_type(), self.priority)
    }
}

fn new_task_id() -> String {
    format!("task_{}", &Uuid::new_v4().simple().to_string()[..12])
}
