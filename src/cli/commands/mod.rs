//! CLI command implementations.

pub mod daemon;
pub mod handoff;
pub mod hypothesis;
pub mod init;
pub mod priority;
pub mod responsibility;
pub mod schedule;
pub mod status;
