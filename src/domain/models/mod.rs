pub mod config;
pub mod engine_status;
pub mod frequency;
pub mod handoff;
pub mod health;
pub mod hypothesis;
pub mod learning;
pub mod notification;
pub mod portfolio;
pub mod priority;
pub mod responsibility;
pub mod scheduled_task;
pub mod snapshot;
pub mod tier;
pub mod worker;

pub use config::{
    Config, CriticalFileConfig, DetectorConfig, HealthDetectorConfig, HypothesisThresholds,
    LoggingConfig, NotificationConfig, PipelineConfig, PortfolioRiskConfig, ResponsibilityConfig,
    RolesConfig, SchedulerConfig, StuckHypothesisConfig, SyncConfig, TimeSensitivityConfig,
    VelocityConfig, WorkerConfig,
};
pub use engine_status::{EngineAggregates, EngineStatus, PipelineHealth};
pub use frequency::{frequency_or_default, next_run_after, parse_frequency};
pub use handoff::{Handoff, HandoffContext, HandoffResult, HandoffStatus};
pub use health::{ErrorEvent, HealthRecord, PipelineRun, ServiceStatus, StateFileStatus};
pub use hypothesis::{clamp_confidence, Evidence, Hypothesis, HypothesisStatus, TestResults, TrackedMarket};
pub use learning::{extract_keywords, Learning};
pub use notification::{Notification, NotificationKind};
pub use portfolio::{ExitReason, Portfolio, Position, TradeRecord};
pub use priority::{Priority, PriorityAction, PriorityContext, PriorityDecision, PriorityType};
pub use responsibility::Responsibility;
pub use scheduled_task::{Backoff, Recurrence, RetryPolicy, ScheduledTask, TaskContext};
pub use snapshot::StoreSnapshot;
pub use tier::PriorityTier;
pub use worker::{PipelineOutcome, WorkSource, WorkerOutcome, WorkerRequest};
