//! Schedule CLI commands for the scheduled-task queue.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use crate::cli::commands::handoff::parse_tier;
use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize, list_table, output, render_list, truncate, CommandOutput,
};
use crate::domain::models::{parse_frequency, Config, ScheduledTask, TaskContext};

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Queue a one-off or recurring task
    Add {
        /// What the task is for
        description: String,

        /// Run this registered pipeline
        #[arg(long, group = "kind", required_unless_present = "role")]
        pipeline: Option<String>,

        /// Hand the task to the worker under this role
        #[arg(long, group = "kind", requires = "instructions")]
        role: Option<String>,

        /// Worker instructions (with --role)
        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        hypothesis: Option<String>,

        /// Due time (RFC3339)
        #[arg(long, group = "when")]
        at: Option<String>,

        /// Due after this long, e.g. 30m or 2h
        #[arg(long = "in", group = "when")]
        delay: Option<String>,

        /// Repeat after each success, e.g. 6h or 1d
        #[arg(long)]
        every: Option<String>,

        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// List the queue in due order
    List,

    /// Queue any configured recurring pipeline that has no pending task
    Heal,
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<ScheduledTask>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        let now = Utc::now();
        let mut table = list_table(&["id", "due", "priority", "type", "every", "tries", "description"]);
        for t in &self.tasks {
            let due = if t.is_due(now) {
                "now".to_string()
            } else {
                t.scheduled_for.format("%Y-%m-%d %H:%M").to_string()
            };
            table.add_row(vec![
                t.id.clone(),
                due,
                colorize(t.priority.as_str()).to_string(),
                t.task_type().to_string(),
                t.recurrence
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |r| r.frequency.clone()),
                t.attempts.to_string(),
                truncate(&t.description, 40),
            ]);
        }
        render_list("scheduled task", "scheduled tasks", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ScheduleActionOutput {
    pub success: bool,
    pub message: String,
    pub tasks: Vec<ScheduledTask>,
}

impl CommandOutput for ScheduleActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: ScheduleArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let queue = ctx.tasks();

    match args.command {
        ScheduleCommands::Add {
            description,
            pipeline,
            role,
            instructions,
            hypothesis,
            at,
            delay,
            every,
            priority,
        } => {
            let tier = parse_tier(&priority)?;
            let context = match (pipeline, role) {
                (Some(pipeline), _) => TaskContext::Pipeline { pipeline },
                (None, Some(role)) => TaskContext::Worker {
                    role,
                    instructions: instructions.unwrap_or_default(),
                    hypothesis_id: hypothesis,
                },
                (None, None) => anyhow::bail!("Specify either --pipeline or --role"),
            };
            let scheduled_for = due_time(at.as_deref(), delay.as_deref(), Utc::now())?;

            let mut task = ScheduledTask::new(description, scheduled_for, tier, context);
            if let Some(every) = every {
                if parse_frequency(&every).is_none() {
                    anyhow::bail!("Invalid frequency '{every}'. Use forms like 30m, 6h or 1d");
                }
                task = task.recurring(every);
            }
            let task = queue.add(task).await?;

            let out = ScheduleActionOutput {
                success: true,
                message: format!("Scheduled {} for {}", task.id, task.scheduled_for.to_rfc3339()),
                tasks: vec![task],
            };
            output(&out, json_mode);
        }

        ScheduleCommands::List => {
            let tasks = queue.list().await?;
            let out = TaskListOutput {
                total: tasks.len(),
                tasks,
            };
            output(&out, json_mode);
        }

        ScheduleCommands::Heal => {
            let healed = queue.heal_recurring(&ctx.config.pipelines, Utc::now()).await?;
            let out = ScheduleActionOutput {
                success: true,
                message: if healed.is_empty() {
                    "Every recurring pipeline already has a queued task".to_string()
                } else {
                    format!("Queued {} missing pipeline task(s)", healed.len())
                },
                tasks: healed,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

fn due_time(at: Option<&str>, delay: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Some(at) = at {
        return Ok(DateTime::parse_from_rfc3339(at)
            .context("Invalid datetime format. Use RFC3339 (e.g., 2026-01-01T00:00:00Z)")?
            .with_timezone(&Utc));
    }
    if let Some(delay) = delay {
        let offset = parse_frequency(delay)
            .with_context(|| format!("Invalid delay '{delay}'. Use forms like 30m, 6h or 1d"))?;
        return now
            .checked_add_signed(offset)
            .with_context(|| format!("Delay '{delay}' is too far in the future"));
    }
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_due_time() {
        let now = Utc::now();
        assert_eq!(due_time(None, None, now).unwrap(), now);
        assert_eq!(due_time(None, Some("2h"), now).unwrap(), now + Duration::hours(2));
        let at = due_time(Some("2026-01-01T00:00:00Z"), None, now).unwrap();
        assert_eq!(at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(due_time(None, Some("soon"), now).is_err());
        assert!(due_time(None, Some("100000000d"), now).is_err());
    }
}
