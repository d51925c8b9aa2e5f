//! Engine and scheduler services.
//!
//! Services hold no state across calls beyond configuration. Everything
//! they act on is re-read from the [`StateStore`](crate::domain::ports::StateStore).

pub mod daemon;
pub mod detectors;
pub mod engine_status;
pub mod handoff_queue;
pub mod hypothesis_lifecycle;
pub mod hypothesis_ranker;
pub mod hypothesis_service;
pub mod priority_engine;
pub mod prompts;
pub mod responsibility_tracker;
pub mod task_queue;

pub use daemon::{Daemon, DaemonDeps, TickOutcome, TickReport};
pub use engine_status::{compute_aggregates, EngineStatusService};
pub use handoff_queue::HandoffQueue;
pub use hypothesis_lifecycle::{EvidenceOutcome, HypothesisStateMachine, TransitionMode};
pub use hypothesis_ranker::{HypothesisRanker, HypothesisScore};
pub use hypothesis_service::{HypothesisService, NewHypothesis};
pub use priority_engine::PriorityEngine;
pub use responsibility_tracker::ResponsibilityTracker;
pub use task_queue::TaskQueue;
