//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use context::AppContext;
pub use display::{output, truncate, CommandOutput};

#[derive(Parser, Debug)]
#[command(name = "edgewise", version, about = "Hypothesis lifecycle engine and priority-driven scheduler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to load instead of .edgewise/config.yaml
    #[arg(short, long, global = true, env = "EDGEWISE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter config and create the state directory
    Init(commands::init::InitArgs),
    /// Run the scheduler loop or a single tick
    Daemon(commands::daemon::DaemonArgs),
    /// Show engine status and queue depths
    Status(commands::status::StatusArgs),
    /// Inspect the priority engine
    Priority(commands::priority::PriorityArgs),
    /// Manage hypotheses
    Hypothesis(commands::hypothesis::HypothesisArgs),
    /// Manage cross-role handoffs
    Handoff(commands::handoff::HandoffArgs),
    /// Manage the scheduled-task queue
    Schedule(commands::schedule::ScheduleArgs),
    /// Inspect and complete recurring responsibilities
    Responsibility(commands::responsibility::ResponsibilityArgs),
}

#[derive(Debug, serde::Serialize)]
struct ErrorOutput {
    success: bool,
    error: String,
}

/// Report a command error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let out = ErrorOutput {
            success: false,
            error: format!("{err:#}"),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_default()
        );
    } else {
        eprintln!("{}", display::action_failure(&format!("{err:#}")));
    }
    std::process::exit(1);
}
