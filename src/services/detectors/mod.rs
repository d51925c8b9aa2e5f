//! Signal detectors.
//!
//! Each detector is a pure function over a [`StoreSnapshot`] producing zero
//! or more [`Priority`] candidates. Detectors never mutate state.
//!
//! | Detector            | Type                | Urgencies              |
//! |---------------------|---------------------|------------------------|
//! | PortfolioRisk       | `portfolio_risk`    | 99, 98, 95, 85, 75     |
//! | TimeSensitivity     | `time_sensitive`    | 90, 70                 |
//! | StuckHypotheses     | `stuck_hypothesis`  | 65, 60                 |
//! | ExecutionVelocity   | `execution_velocity`| 70, 50                 |
//! | SystemHealth        | `system_health`     | 90, 85, 80, 75, 60, 55, 50 |
//!
//! Registration order in [`default_detectors`] matches the declaration
//! order of [`PriorityType`](crate::domain::models::PriorityType), which is
//! also the tiebreak order for equal urgencies.

pub mod execution_velocity;
pub mod portfolio_risk;
pub mod stuck_hypotheses;
pub mod system_health;
pub mod time_sensitivity;

pub use execution_velocity::ExecutionVelocityDetector;
pub use portfolio_risk::PortfolioRiskDetector;
pub use stuck_hypotheses::StuckHypothesesDetector;
pub use system_health::SystemHealthDetector;
pub use time_sensitivity::TimeSensitivityDetector;

use crate::domain::models::{DetectorConfig, Priority, PriorityType, StoreSnapshot};

/// A read-only scanner that turns store state into priority candidates.
pub trait SignalDetector: Send + Sync {
    fn priority_type(&self) -> PriorityType;

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority>;
}

/// The five standard detectors in registration order.
pub fn default_detectors(config: &DetectorConfig) -> Vec<Box<dyn SignalDetector>> {
    vec![
        Box::new(PortfolioRiskDetector::new(config.portfolio.clone())),
        Box::new(TimeSensitivityDetector::new(config.time.clone())),
        Box::new(StuckHypothesesDetector::new(config.stuck.clone())),
        Box::new(ExecutionVelocityDetector::new(config.velocity.clone())),
        Box::new(SystemHealthDetector::new(config.health.clone())),
    ]
}

/// Hours from `from` to `to`, fractional.
pub(crate) fn hours_between(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}
