//! Edgewise - hypothesis lifecycle engine and priority-driven scheduler
//!
//! Edgewise keeps a paper-trading research agent honest: every trading idea
//! is a hypothesis with a confidence, an evidence trail and a guarded
//! lifecycle, and a single-threaded scheduler decides what the agent works
//! on next.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): state machine, detectors, priority engine, scheduler
//! - **Adapter Layer** (`adapters`): JSON store, executors, sync, notifiers
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edgewise::adapters::store::MemoryStore;
//! use edgewise::adapters::notifiers::TracingNotifier;
//! use edgewise::services::{HypothesisService, NewHypothesis};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = edgewise::Config::default();
//!     let service = HypothesisService::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(TracingNotifier),
//!         config.hypothesis,
//!         config.roles,
//!     );
//!     service
//!         .create(NewHypothesis {
//!             statement: "Weather markets overprice rain".to_string(),
//!             ..NewHypothesis::default()
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, Handoff, HandoffStatus, Hypothesis, HypothesisStatus, Priority, PriorityDecision,
    PriorityTier, PriorityType, Responsibility, ScheduledTask, StoreSnapshot,
};
pub use domain::ports::{CodeExecutor, Notifier, PipelineExecutor, StateStore, StoreSync, WorkerExecutor};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Daemon, DaemonDeps, HypothesisService, PriorityEngine, TickOutcome, TickReport};
