//! One-way human-readable notifications about tick outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskStarted,
    TaskSucceeded,
    TaskFailed,
    StrategicOverride,
    HypothesisTransition,
    TransitionRejected,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskStarted => "task_started",
            Self::TaskSucceeded => "task_succeeded",
            Self::TaskFailed => "task_failed",
            Self::StrategicOverride => "strategic_override",
            Self::HypothesisTransition => "hypothesis_transition",
            Self::TransitionRejected => "transition_rejected",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            at: Utc::now(),
        }
    }

    /// Single-line rendering for chat sinks and logs.
    pub fn render(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}
