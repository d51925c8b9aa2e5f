//! Priority engine CLI commands.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, PriorityDecision};

#[derive(Args, Debug)]
pub struct PriorityArgs {
    #[command(subcommand)]
    pub command: PriorityCommands,
}

#[derive(Subcommand, Debug)]
pub enum PriorityCommands {
    /// Run every detector against current state without executing anything
    Scan,
}

#[derive(Debug, serde::Serialize)]
pub struct ScanOutput {
    #[serde(flatten)]
    pub decision: PriorityDecision,
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["urgency", "type", "action", "executor", "summary"]);
        for p in &self.decision.candidates {
            table.add_row(vec![
                p.urgency.to_string(),
                p.priority_type.to_string(),
                p.action.to_string(),
                if p.requires_worker { "worker" } else { "code" }.to_string(),
                truncate(&p.summary, 60),
            ]);
        }
        let mut lines = vec![render_list(
            "priority",
            "priorities",
            &table,
            self.decision.candidates.len(),
        )];
        if let Some(p) = &self.decision.selected {
            lines.push(format!(
                "\nOverride: {} ({}, urgency {})",
                p.action, p.priority_type, p.urgency
            ));
        } else if let Some(top) = self.decision.candidates.first() {
            lines.push(format!(
                "\nTop priority {} (urgency {}) does not override scheduled work",
                top.action, top.urgency
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: PriorityArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    match args.command {
        PriorityCommands::Scan => {
            let snapshot = ctx
                .store
                .snapshot(&ctx.config.detectors.health.critical_files, Utc::now())
                .await?;
            let decision = ctx.priority_engine().evaluate(&snapshot);
            output(&ScanOutput { decision }, json_mode);
        }
    }
    Ok(())
}
