//! Cross-role handoff domain model.
//!
//! A handoff is a work request from one role to another. Its status only
//! moves forward: `pending -> in_progress -> completed | failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::tier::PriorityTier;

/// Status of a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl Default for HandoffStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn valid_transitions(&self) -> Vec<HandoffStatus> {
        match self {
            Self::Pending => vec![Self::InProgress],
            Self::InProgress => vec![Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context for a handoff, with room for extra fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandoffContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Terminal result recorded on a handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffResult {
    pub success: bool,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A cross-role work request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub id: String,
    pub from_role: String,
    pub to_role: String,
    /// Free-form kind, e.g. `unblock-hypothesis` or `review`.
    pub handoff_type: String,
    pub priority: PriorityTier,
    pub status: HandoffStatus,
    #[serde(default)]
    pub context: HandoffContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<HandoffResult>,
}

impl Handoff {
    pub fn new(
        from_role: impl Into<String>,
        to_role: impl Into<String>,
        handoff_type: impl Into<String>,
        priority: PriorityTier,
        context: HandoffContext,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("handoff_{}", &Uuid::new_v4().simple().to_string()[..12]),
            from_role: from_role.into(),
            to_role: to_role.into(),
            handoff_type: handoff_type.into(),
            priority,
            status: HandoffStatus::Pending,
            context,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            result: None,
        }
    }
}
