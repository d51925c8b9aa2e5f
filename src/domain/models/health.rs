//! System health records read by the health detector.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Status of one external service as last reported by the health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub up: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// An error logged by any component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    pub message: String,
}

/// Latest health-check report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub services: Vec<ServiceStatus>,
    #[serde(default)]
    pub errors: Vec<ErrorEvent>,
}

impl HealthRecord {
    /// Errors logged at or after `since`.
    pub fn errors_since(&self, since: DateTime<Utc>) -> usize {
        self.errors.iter().filter(|e| e.at >= since).count()
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.checked_at).num_seconds() as f64 / 3600.0
    }
}

/// One pipeline execution, recorded by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub pipeline: String,
    pub at: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Presence and freshness of one critical state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFileStatus {
    pub name: String,
    pub exists: bool,
    pub modified_at: Option<DateTime<Utc>>,
    /// Age after which the file counts as stale.
    pub stale_after_hours: f64,
}

impl StateFileStatus {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.modified_at {
            Some(modified) if self.exists => {
                let limit = Duration::seconds((self.stale_after_hours * 3600.0) as i64);
                now - modified > limit
            }
            _ => false,
        }
    }
}
