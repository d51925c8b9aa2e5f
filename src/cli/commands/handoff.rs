//! Handoff CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize, list_table, output, render_list, truncate, CommandOutput,
};
use crate::domain::models::{Config, Handoff, HandoffContext, HandoffStatus, PriorityTier};

#[derive(Args, Debug)]
pub struct HandoffArgs {
    #[command(subcommand)]
    pub command: HandoffCommands,
}

#[derive(Subcommand, Debug)]
pub enum HandoffCommands {
    /// Queue work for another role
    Create {
        /// Requesting role
        #[arg(long)]
        from: String,

        /// Role that should pick the work up
        #[arg(long)]
        to: String,

        /// Free-form type, e.g. review or unblock-hypothesis
        #[arg(long = "type")]
        handoff_type: String,

        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: String,

        #[arg(long)]
        hypothesis: Option<String>,

        #[arg(long)]
        reason: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List handoffs
    List {
        /// Filter by status (pending, in_progress, completed, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show the handoff the scheduler would pick next
    Next,
}

#[derive(Debug, serde::Serialize)]
pub struct HandoffListOutput {
    pub handoffs: Vec<Handoff>,
    pub total: usize,
}

impl CommandOutput for HandoffListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "priority", "status", "from", "to", "type", "reason"]);
        for h in &self.handoffs {
            table.add_row(vec![
                h.id.clone(),
                colorize(h.priority.as_str()).to_string(),
                colorize(h.status.as_str()).to_string(),
                h.from_role.clone(),
                h.to_role.clone(),
                h.handoff_type.clone(),
                truncate(h.context.reason.as_deref().unwrap_or("-"), 40),
            ]);
        }
        render_list("handoff", "handoffs", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HandoffActionOutput {
    pub success: bool,
    pub message: String,
    pub handoff: Option<Handoff>,
}

impl CommandOutput for HandoffActionOutput {
    fn to_human(&self) -> String {
        if self.success {
            action_success(&self.message)
        } else {
            self.message.clone()
        }
    }
}

pub async fn execute(args: HandoffArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let queue = ctx.handoffs();

    match args.command {
        HandoffCommands::Create {
            from,
            to,
            handoff_type,
            priority,
            hypothesis,
            reason,
            notes,
        } => {
            let tier = parse_tier(&priority)?;
            let context = HandoffContext {
                hypothesis_id: hypothesis,
                reason,
                notes,
                ..HandoffContext::default()
            };
            let handoff = queue.create(&from, &to, &handoff_type, tier, context).await?;
            let out = HandoffActionOutput {
                success: true,
                message: format!(
                    "Created {} handoff {} ({} -> {})",
                    handoff.priority, handoff.id, handoff.from_role, handoff.to_role
                ),
                handoff: Some(handoff),
            };
            output(&out, json_mode);
        }

        HandoffCommands::List { status } => {
            let status = status
                .as_deref()
                .map(|s| {
                    HandoffStatus::from_str(s).with_context(|| format!("Unknown handoff status '{s}'"))
                })
                .transpose()?;
            let handoffs = queue.list(status).await?;
            let out = HandoffListOutput {
                total: handoffs.len(),
                handoffs,
            };
            output(&out, json_mode);
        }

        HandoffCommands::Next => {
            let next = queue.next_pending().await?;
            let out = HandoffActionOutput {
                success: next.is_some(),
                message: next.as_ref().map_or_else(
                    || "No pending handoffs.".to_string(),
                    |h| format!("Next: {} ({}, {} -> {})", h.id, h.priority, h.from_role, h.to_role),
                ),
                handoff: next,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

pub(crate) fn parse_tier(s: &str) -> Result<PriorityTier> {
    PriorityTier::from_str(s)
        .with_context(|| format!("Unknown priority '{s}'. Use low, medium, high or critical"))
}
