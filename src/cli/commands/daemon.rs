//! Daemon CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{colorize, output, CommandOutput, DetailView};
use crate::domain::models::Config;
use crate::services::{TickOutcome, TickReport};

#[derive(Args, Debug)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommands,
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommands {
    /// Tick on the configured interval until ctrl-c
    Run,
    /// Run exactly one tick and print what it did
    Tick,
}

#[derive(Debug, serde::Serialize)]
pub struct TickOutput {
    #[serde(flatten)]
    pub report: TickReport,
}

impl CommandOutput for TickOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        let duration_ms = (r.finished_at - r.started_at).num_milliseconds();
        let mut view = DetailView::new(&format!("Tick {}", r.tick))
            .field("Outcome", colorize(r.outcome.label()))
            .field("Duration", format!("{duration_ms} ms"))
            .field("Pulled", r.pulled)
            .field("Pushed", r.pushed)
            .field(
                "Health",
                r.engine_health
                    .map_or_else(|| "unknown".to_string(), |h| colorize(h.as_str()).to_string()),
            );
        if r.healed > 0 {
            view = view.field("Self-healed", r.healed);
        }

        view = match &r.outcome {
            TickOutcome::Override {
                action,
                urgency,
                executor,
                success,
            } => view
                .section("Strategic override")
                .field("Action", action)
                .field("Urgency", urgency)
                .field("Executor", executor)
                .field("Success", success),
            TickOutcome::Responsibility {
                role,
                name,
                success,
            } => view
                .section("Responsibility")
                .field("Role", role)
                .field("Name", name)
                .field("Success", success),
            TickOutcome::Handoff {
                handoff_id,
                handoff_type,
                success,
            } => view
                .section("Handoff")
                .field("ID", handoff_id)
                .field("Type", handoff_type)
                .field("Success", success),
            TickOutcome::ScheduledTask {
                task_id,
                task_type,
                success,
            } => view
                .section("Scheduled task")
                .field("ID", task_id)
                .field("Type", task_type)
                .field("Success", success),
            TickOutcome::Error { message } => view.section("Error").item(message.clone()),
            TickOutcome::Busy | TickOutcome::Idle => view,
        };
        view.render()
    }
}

pub async fn execute(args: DaemonArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let daemon = ctx.daemon();

    match args.command {
        DaemonCommands::Run => {
            daemon.run().await.context("Daemon stopped with an error")?;
        }
        DaemonCommands::Tick => {
            daemon.seed().await.context("Failed to seed schedules")?;
            let report = daemon.tick().await;
            output(&TickOutput { report }, json_mode);
        }
    }
    Ok(())
}
