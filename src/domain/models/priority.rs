//! Priority signals emitted by the detectors.
//!
//! A priority is recomputed from scratch on every detection pass and is
//! never persisted. Its context is a closed sum type so each detector's
//! payload is checked at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which detector produced a priority. Declaration order is also the
/// tiebreak order when urgencies are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityType {
    PortfolioRisk,
    TimeSensitive,
    StuckHypothesis,
    ExecutionVelocity,
    SystemHealth,
}

impl PriorityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortfolioRisk => "portfolio_risk",
            Self::TimeSensitive => "time_sensitive",
            Self::StuckHypothesis => "stuck_hypothesis",
            Self::ExecutionVelocity => "execution_velocity",
            Self::SystemHealth => "system_health",
        }
    }
}

impl fmt::Display for PriorityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What should be done about a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityAction {
    ExecuteStopLoss,
    ExecuteTakeProfit,
    ReviewCriticalLoss,
    ReviewPositionLoss,
    ReviewStopProximity,
    ReviewMarketClose,
    AdvanceProposedHypothesis,
    RescueLowConfidence,
    IncreaseTradingVelocity,
    BootstrapHealthCheck,
    InvestigateErrorSpike,
    RefreshHealthCheck,
    RestoreService,
    InvestigatePipelineFailures,
    RestoreStateFile,
    NoteStaleStateFile,
}

impl PriorityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecuteStopLoss => "execute-stop-loss",
            Self::ExecuteTakeProfit => "execute-take-profit",
            Self::ReviewCriticalLoss => "review-critical-loss",
            Self::ReviewPositionLoss => "review-position-loss",
            Self::ReviewStopProximity => "review-stop-proximity",
            Self::ReviewMarketClose => "review-market-close",
            Self::AdvanceProposedHypothesis => "advance-proposed-hypothesis",
            Self::RescueLowConfidence => "rescue-low-confidence",
            Self::IncreaseTradingVelocity => "increase-trading-velocity",
            Self::BootstrapHealthCheck => "bootstrap-health-check",
            Self::InvestigateErrorSpike => "investigate-error-spike",
            Self::RefreshHealthCheck => "refresh-health-check",
            Self::RestoreService => "restore-service",
            Self::InvestigatePipelineFailures => "investigate-pipeline-failures",
            Self::RestoreStateFile => "restore-state-file",
            Self::NoteStaleStateFile => "note-stale-state-file",
        }
    }
}

impl fmt::Display for PriorityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector-specific payload carried by a priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriorityContext {
    Position {
        position_id: String,
        market_id: String,
        pnl_pct: f64,
        entry_price: f64,
        current_price: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    },
    MarketClose {
        hypothesis_id: String,
        market_id: String,
        question: String,
        hours_to_close: f64,
    },
    StuckHypothesis {
        hypothesis_id: String,
        status: String,
        hours_since_update: f64,
        confidence: f64,
    },
    Velocity {
        trades_in_window: usize,
        target: u32,
        window_days: u32,
    },
    HealthMissing,
    ErrorRate {
        errors_last_hour: usize,
    },
    HealthStale {
        age_hours: f64,
    },
    ServiceDown {
        service: String,
        detail: Option<String>,
    },
    PipelineFailures {
        pipeline: String,
        failures: usize,
    },
    StateFileMissing {
        file: String,
    },
    StateFileStale {
        file: String,
        age_hours: f64,
    },
}

/// A scored signal that some unit of work should preempt normal scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub priority_type: PriorityType,
    /// 0-100; higher is more urgent.
    pub urgency: u8,
    pub action: PriorityAction,
    pub summary: String,
    pub context: PriorityContext,
    /// False means the code executor can handle it in-process.
    pub requires_worker: bool,
    /// Focused instructions for the worker, when one is needed.
    pub instructions: Option<String>,
}

impl Priority {
    /// A priority that needs the reasoning worker.
    pub fn for_worker(
        priority_type: PriorityType,
        urgency: u8,
        action: PriorityAction,
        summary: impl Into<String>,
        context: PriorityContext,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            priority_type,
            urgency: urgency.min(100),
            action,
            summary: summary.into(),
            context,
            requires_worker: true,
            instructions: Some(instructions.into()),
        }
    }

    /// A priority the code executor can act on directly.
    pub fn for_code(
        priority_type: PriorityType,
        urgency: u8,
        action: PriorityAction,
        summary: impl Into<String>,
        context: PriorityContext,
    ) -> Self {
        Self {
            priority_type,
            urgency: urgency.min(100),
            action,
            summary: summary.into(),
            context,
            requires_worker: false,
            instructions: None,
        }
    }

    pub fn is_code_executable(&self) -> bool {
        !self.requires_worker
    }
}

/// Outcome of ranking all detector output for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityDecision {
    pub should_override: bool,
    pub selected: Option<Priority>,
    /// Every candidate, sorted most urgent first.
    pub candidates: Vec<Priority>,
}

impl PriorityDecision {
    pub fn none() -> Self {
        Self {
            should_override: false,
            selected: None,
            candidates: Vec::new(),
        }
    }
}
