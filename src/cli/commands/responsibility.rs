//! Responsibility CLI commands.

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{action_success, list_table, output, render_list, CommandOutput};
use crate::domain::models::{Config, Responsibility};

#[derive(Args, Debug)]
pub struct ResponsibilityArgs {
    #[command(subcommand)]
    pub command: ResponsibilityCommands,
}

#[derive(Subcommand, Debug)]
pub enum ResponsibilityCommands {
    /// List every responsibility
    List,
    /// List due responsibilities, most overdue first
    Due,
    /// Mark a responsibility as done now
    Complete { role: String, name: String },
}

#[derive(Debug, serde::Serialize)]
pub struct ResponsibilityRow {
    #[serde(flatten)]
    pub responsibility: Responsibility,
    /// Seconds past due; `None` when not due or never run.
    pub overdue_secs: Option<i64>,
    pub never_run: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ResponsibilityListOutput {
    pub responsibilities: Vec<ResponsibilityRow>,
    pub total: usize,
}

impl CommandOutput for ResponsibilityListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["role", "name", "every", "last run", "overdue"]);
        for row in &self.responsibilities {
            let r = &row.responsibility;
            table.add_row(vec![
                r.role.clone(),
                r.name.clone(),
                r.frequency.clone(),
                r.last_run
                    .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
                overdue_label(row),
            ]);
        }
        render_list("responsibility", "responsibilities", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ResponsibilityActionOutput {
    pub success: bool,
    pub message: String,
    pub responsibility: Responsibility,
}

impl CommandOutput for ResponsibilityActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: ResponsibilityArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let tracker = ctx.responsibilities();
    let now = Utc::now();

    match args.command {
        ResponsibilityCommands::List => {
            let default_frequency = &ctx.config.scheduler.default_frequency;
            let responsibilities: Vec<ResponsibilityRow> = tracker
                .list()
                .await?
                .into_iter()
                .map(|r| {
                    let overdue = r.overdue_by(now, default_frequency);
                    row(r, overdue)
                })
                .collect();
            let out = ResponsibilityListOutput {
                total: responsibilities.len(),
                responsibilities,
            };
            output(&out, json_mode);
        }

        ResponsibilityCommands::Due => {
            let responsibilities: Vec<ResponsibilityRow> = tracker
                .due(now)
                .await?
                .into_iter()
                .map(|(r, overdue)| row(r, Some(overdue)))
                .collect();
            let out = ResponsibilityListOutput {
                total: responsibilities.len(),
                responsibilities,
            };
            output(&out, json_mode);
        }

        ResponsibilityCommands::Complete { role, name } => {
            let responsibility = tracker.mark_complete(&role, &name, now).await?;
            let out = ResponsibilityActionOutput {
                success: true,
                message: format!("Marked {role}/{name} complete"),
                responsibility,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

fn row(responsibility: Responsibility, overdue: Option<Duration>) -> ResponsibilityRow {
    let never_run = responsibility.last_run.is_none();
    ResponsibilityRow {
        responsibility,
        overdue_secs: overdue.filter(|_| !never_run).map(|d| d.num_seconds()),
        never_run,
    }
}

fn overdue_label(row: &ResponsibilityRow) -> String {
    if row.never_run {
        return "never run".to_string();
    }
    match row.overdue_secs {
        Some(secs) if secs >= 3600 => format!("{}h", secs / 3600),
        Some(secs) => format!("{}m", secs / 60),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_labels() {
        let fresh = row(Responsibility::new("research", "scan", "1d"), Some(Duration::MAX));
        assert!(fresh.never_run);
        assert!(fresh.overdue_secs.is_none());
        assert_eq!(overdue_label(&fresh), "never run");

        let mut ran = Responsibility::new("trader", "review", "1h");
        ran.last_run = Some(Utc::now());
        let late = row(ran.clone(), Some(Duration::hours(3)));
        assert_eq!(overdue_label(&late), "3h");
        let on_time = row(ran, None);
        assert_eq!(overdue_label(&on_time), "-");
    }
}
