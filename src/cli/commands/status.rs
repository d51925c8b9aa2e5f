//! `edgewise status`: engine aggregates and queue depths.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize, output, CommandOutput, DetailView};
use crate::domain::models::{Config, HandoffStatus, PipelineHealth};
use crate::services::{compute_aggregates, HypothesisStateMachine};

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub health: PipelineHealth,
    pub hypotheses: BTreeMap<String, usize>,
    pub total_hypotheses: usize,
    pub testable: Vec<String>,
    pub last_tick_status_at: Option<String>,
    pub pending_handoffs: usize,
    pub queued_tasks: usize,
    pub due_tasks: usize,
    pub due_responsibilities: usize,
    pub cash: f64,
    pub open_positions: usize,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut view = DetailView::new("Engine status")
            .field("Health", colorize(self.health.as_str()))
            .field("Testable", self.testable.len())
            .field(
                "Last tick",
                self.last_tick_status_at.as_deref().unwrap_or("never"),
            )
            .section("Hypotheses");
        for (status, count) in &self.hypotheses {
            view = view.field(status, count);
        }
        view.field("total", self.total_hypotheses)
            .section("Queues")
            .field("Pending handoffs", self.pending_handoffs)
            .field("Scheduled tasks", format!("{} ({} due)", self.queued_tasks, self.due_tasks))
            .field("Due responsibilities", self.due_responsibilities)
            .section("Portfolio")
            .field("Cash", format!("{:.2}", self.cash))
            .field("Open positions", self.open_positions)
            .render()
    }
}

pub async fn execute(_args: StatusArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let now = Utc::now();

    let hypotheses = ctx.store.load_hypotheses().await?;
    let machine = HypothesisStateMachine::new(ctx.config.hypothesis.clone(), ctx.config.roles.clone());
    let aggregates = compute_aggregates(&hypotheses, &machine, &ctx.config.scheduler);
    let stored = ctx.store.load_engine_status().await?;

    let pending_handoffs = ctx.handoffs().list(Some(HandoffStatus::Pending)).await?.len();
    let tasks = ctx.tasks().list().await?;
    let due_tasks = tasks.iter().filter(|t| t.is_due(now)).count();
    let due_responsibilities = ctx.responsibilities().due(now).await?.len();
    let portfolio = ctx.store.load_portfolio().await?;

    let out = StatusOutput {
        health: aggregates.health,
        hypotheses: aggregates.counts,
        total_hypotheses: aggregates.total,
        testable: aggregates.testable,
        last_tick_status_at: stored.map(|s| s.computed_at.to_rfc3339()),
        pending_handoffs,
        queued_tasks: tasks.len(),
        due_tasks,
        due_responsibilities,
        cash: portfolio.cash,
        open_positions: portfolio.positions.len(),
    };
    output(&out, json_mode);
    Ok(())
}
