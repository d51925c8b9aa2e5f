//! Infrastructure adapters for external systems.

pub mod code_executor;
pub mod notifiers;
pub mod pipeline;
pub mod store;
pub mod sync;
pub mod workers;
