//! System health: health-check record, pipeline failures, state files.

use std::collections::BTreeMap;

use chrono::Duration;

use crate::domain::models::{
    HealthDetectorConfig, Priority, PriorityAction, PriorityContext, PriorityType, StoreSnapshot,
};
use crate::services::prompts::priority_instructions;

use super::{hours_between, SignalDetector};

pub const URGENCY_MISSING_STATE_FILE: u8 = 90;
pub const URGENCY_SERVICE_DOWN: u8 = 85;
pub const URGENCY_ERROR_SPIKE: u8 = 80;
pub const URGENCY_PIPELINE_FAILURES: u8 = 75;
pub const URGENCY_BOOTSTRAP: u8 = 60;
pub const URGENCY_STALE_STATE_FILE: u8 = 55;
pub const URGENCY_STALE_HEALTH: u8 = 50;

pub struct SystemHealthDetector {
    config: HealthDetectorConfig,
}

impl SystemHealthDetector {
    pub fn new(config: HealthDetectorConfig) -> Self {
        Self { config }
    }

    fn worker(urgency: u8, action: PriorityAction, summary: String, context: PriorityContext) -> Priority {
        let instructions = priority_instructions(action, &summary, &context);
        Priority::for_worker(
            PriorityType::SystemHealth,
            urgency,
            action,
            summary,
            context,
            instructions,
        )
    }

    fn code(urgency: u8, action: PriorityAction, summary: String, context: PriorityContext) -> Priority {
        Priority::for_code(PriorityType::SystemHealth, urgency, action, summary, context)
    }

    fn scan_health_record(&self, snapshot: &StoreSnapshot, out: &mut Vec<Priority>) {
        let now = snapshot.taken_at;
        let Some(health) = &snapshot.health else {
            out.push(Self::worker(
                URGENCY_BOOTSTRAP,
                PriorityAction::BootstrapHealthCheck,
                "No health check has ever run".to_string(),
                PriorityContext::HealthMissing,
            ));
            return;
        };

        let errors_last_hour = health.errors_since(now - Duration::hours(1));
        if errors_last_hour >= self.config.max_errors_per_hour {
            out.push(Self::worker(
                URGENCY_ERROR_SPIKE,
                PriorityAction::InvestigateErrorSpike,
                format!("{errors_last_hour} errors in the last hour"),
                PriorityContext::ErrorRate { errors_last_hour },
            ));
        }

        let age_hours = health.age_hours(now);
        if age_hours > self.config.stale_health_hours {
            out.push(Self::code(
                URGENCY_STALE_HEALTH,
                PriorityAction::RefreshHealthCheck,
                format!("Health check is {age_hours:.1}h old"),
                PriorityContext::HealthStale { age_hours },
            ));
        }

        for service in health.services.iter().filter(|s| !s.up) {
            out.push(Self::worker(
                URGENCY_SERVICE_DOWN,
                PriorityAction::RestoreService,
                format!("{} is down", service.name),
                PriorityContext::ServiceDown {
                    service: service.name.clone(),
                    detail: service.detail.clone(),
                },
            ));
        }
    }

    fn scan_pipeline_runs(&self, snapshot: &StoreSnapshot, out: &mut Vec<Priority>) {
        let since = snapshot.taken_at - Duration::hours(24);
        let mut failures: BTreeMap<&str, usize> = BTreeMap::new();
        for run in snapshot
            .pipeline_runs
            .iter()
            .filter(|r| !r.success && r.at >= since)
        {
            *failures.entry(run.pipeline.as_str()).or_default() += 1;
        }

        for (pipeline, count) in failures {
            if count >= self.config.max_pipeline_failures {
                out.push(Self::worker(
                    URGENCY_PIPELINE_FAILURES,
                    PriorityAction::InvestigatePipelineFailures,
                    format!("{pipeline} failed {count} times in 24h"),
                    PriorityContext::PipelineFailures {
                        pipeline: pipeline.to_string(),
                        failures: count,
                    },
                ));
            }
        }
    }

    fn scan_state_files(&self, snapshot: &StoreSnapshot, out: &mut Vec<Priority>) {
        let now = snapshot.taken_at;
        for file in &snapshot.state_files {
            if !file.exists {
                out.push(Self::worker(
                    URGENCY_MISSING_STATE_FILE,
                    PriorityAction::RestoreStateFile,
                    format!("{} is missing", file.name),
                    PriorityContext::StateFileMissing {
                        file: file.name.clone(),
                    },
                ));
            } else if file.is_stale(now) {
                let age_hours = file
                    .modified_at
                    .map(|m| hours_between(m, now))
                    .unwrap_or_default();
                out.push(Self::code(
                    URGENCY_STALE_STATE_FILE,
                    PriorityAction::NoteStaleStateFile,
                    format!("{} not updated for {age_hours:.1}h", file.name),
                    PriorityContext::StateFileStale {
                        file: file.name.clone(),
                        age_hours,
                    },
                ));
            }
        }
    }
}

impl SignalDetector for SystemHealthDetector {
    fn priority_type(&self) -> PriorityType {
        PriorityType::SystemHealth
    }

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        let mut out = Vec::new();
        self.scan_health_record(snapshot, &mut out);
        self.scan_pipeline_runs(snapshot, &mut out);
        self.scan_state_files(snapshot, &mut out);
        out
    }
}
