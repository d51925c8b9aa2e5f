//! Executor request and outcome models.
//!
//! The scheduler never interprets worker output beyond its exit status, so
//! these types stay small: a focused prompt going in, an exit code and
//! captured output coming back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of unit of work a worker dispatch is serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum WorkSource {
    Override { action: String, urgency: u8 },
    Responsibility { name: String },
    Handoff { handoff_id: String, handoff_type: String },
    ScheduledTask { task_id: String },
}

impl WorkSource {
    pub fn label(&self) -> String {
        match self {
            Self::Override { action, urgency } => format!("override {action} ({urgency})"),
            Self::Responsibility { name } => format!("responsibility {name}"),
            Self::Handoff { handoff_id, handoff_type } => {
                format!("handoff {handoff_type} [{handoff_id}]")
            }
            Self::ScheduledTask { task_id } => format!("scheduled task {task_id}"),
        }
    }
}

/// A focused unit of work for the reasoning worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Correlates log lines for one dispatch.
    pub id: Uuid,
    /// Role the worker acts as, e.g. `research`.
    pub role: String,
    pub source: WorkSource,
    /// The focused prompt.
    pub instructions: String,
}

impl WorkerRequest {
    pub fn new(role: impl Into<String>, source: WorkSource, instructions: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: role.into(),
            source,
            instructions: instructions.into(),
        }
    }
}

/// Terminal result of a worker dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub exit_code: i32,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkerOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of running a named pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: String,
}
