//! Reasoning worker implementations.

pub mod claude_code;
pub mod mock;

pub use claude_code::ClaudeCodeWorker;
pub use mock::{MockResponse, MockWorker};
