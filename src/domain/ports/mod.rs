//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces that adapters implement:
//! - StateStore: the shared file-backed store
//! - CodeExecutor, WorkerExecutor, PipelineExecutor: the three executors
//! - StoreSync: best-effort pull/push of shared state
//! - Notifier: one-way human-readable notifications

pub mod executors;
pub mod state_store;
pub mod sync;

pub use executors::{CodeExecutor, PipelineExecutor, WorkerExecutor};
pub use state_store::StateStore;
pub use sync::{notify_best_effort, Notifier, StoreSync};
