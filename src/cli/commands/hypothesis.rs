//! Hypothesis CLI commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize, list_table, output, render_list, truncate, CommandOutput, DetailView,
};
use crate::domain::models::{Config, Hypothesis, HypothesisStatus, TrackedMarket};
use crate::services::{HypothesisRanker, HypothesisScore, NewHypothesis};

#[derive(Args, Debug)]
pub struct HypothesisArgs {
    #[command(subcommand)]
    pub command: HypothesisCommands,
}

#[derive(Subcommand, Debug)]
pub enum HypothesisCommands {
    /// Record a new proposed hypothesis
    Create {
        /// The falsifiable claim
        statement: String,

        /// Why the edge should exist
        #[arg(long, default_value = "")]
        rationale: String,

        /// How the claim will be tested
        #[arg(long, default_value = "")]
        test_method: String,

        #[arg(long)]
        entry_rules: Option<String>,

        #[arg(long)]
        exit_rules: Option<String>,

        /// Starting confidence (defaults to the configured initial confidence)
        #[arg(long)]
        confidence: Option<f64>,

        /// Market to track, as ID or ID@CLOSE_TIME (RFC3339). Repeatable.
        #[arg(long = "market", value_parser = parse_market)]
        markets: Vec<TrackedMarket>,

        /// Trades required before validation (overrides the configured default)
        #[arg(long)]
        min_sample_size: Option<u32>,

        /// Expected average win / average loss
        #[arg(long)]
        expected_payoff: Option<f64>,

        /// Tag. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List hypotheses
    List {
        /// Filter by status (proposed, testing, validated, invalidated, blocked)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one hypothesis with its evidence
    Show { id: String },

    /// Move a hypothesis to a new status
    Transition {
        id: String,

        /// Target status
        status: String,

        /// Required for blocked; becomes the conclusion when concluding
        #[arg(long)]
        reason: Option<String>,
    },

    /// Attach an observation and adjust confidence
    Evidence {
        id: String,

        observation: String,

        /// Confidence change, e.g. 0.05 or -0.1
        #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
        delta: f64,

        /// The observation supports the hypothesis
        #[arg(long, conflicts_with = "contradicts")]
        supports: bool,

        /// The observation contradicts the hypothesis
        #[arg(long)]
        contradicts: bool,
    },

    /// Record a resolved trade against a hypothesis
    Trade {
        id: String,

        /// The trade was a win (a loss otherwise)
        #[arg(long)]
        won: bool,

        /// Realized profit or loss
        #[arg(long, allow_hyphen_values = true)]
        pnl: f64,
    },

    /// Apply the automatic validation and invalidation guards
    Evaluate { id: String },

    /// Rank open hypotheses by weighted score
    Rank,
}

// -- Output structs --

#[derive(Debug, serde::Serialize)]
pub struct HypothesisListOutput {
    pub hypotheses: Vec<Hypothesis>,
    pub total: usize,
}

impl CommandOutput for HypothesisListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "status", "conf", "trades", "win rate", "statement"]);
        for h in &self.hypotheses {
            table.add_row(vec![
                h.id.clone(),
                colorize(h.status.as_str()).to_string(),
                format!("{:.2}", h.confidence),
                h.test_results.trades.to_string(),
                format!("{:.0}%", h.test_results.win_rate * 100.0),
                truncate(&h.statement, 50),
            ]);
        }
        render_list("hypothesis", "hypotheses", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HypothesisDetailOutput {
    pub hypothesis: Hypothesis,
}

impl CommandOutput for HypothesisDetailOutput {
    fn to_human(&self) -> String {
        let h = &self.hypothesis;
        let trajectory: Vec<String> = h
            .confidence_trajectory()
            .iter()
            .map(|c| format!("{c:.2}"))
            .collect();
        let mut view = DetailView::new(&format!("Hypothesis {}", h.id))
            .field("Statement", &h.statement)
            .field("Status", colorize(h.status.as_str()))
            .field("Confidence", format!("{:.2}", h.confidence))
            .field("Trajectory", trajectory.join(" -> "))
            .field_opt("Blocked", h.blocked_reason.as_deref())
            .field_opt("Conclusion", h.conclusion.as_deref())
            .field("Created", h.created_at.to_rfc3339())
            .section("Test plan")
            .field("Rationale", &h.rationale)
            .field("Method", &h.test_method)
            .field_opt("Entry", h.entry_rules.as_deref())
            .field_opt("Exit", h.exit_rules.as_deref())
            .section("Results")
            .field("Trades", h.test_results.trades)
            .field(
                "Win rate",
                format!("{:.0}%", h.test_results.win_rate * 100.0),
            )
            .field("Total PnL", format!("{:+.2}", h.test_results.total_pnl));

        if !h.markets.is_empty() {
            view = view.section("Markets");
            for m in &h.markets {
                let close = m
                    .close_time
                    .map_or_else(String::new, |t| format!(" (closes {})", t.to_rfc3339()));
                view = view.item(format!("{}{close}", m.id));
            }
        }
        if !h.evidence.is_empty() {
            view = view.section("Evidence");
            for e in &h.evidence {
                let marker = match e.support {
                    Some(true) => "+",
                    Some(false) => "-",
                    None => "~",
                };
                view = view.item(format!(
                    "[{marker}] {:+.2} -> {:.2}  {}",
                    e.confidence_delta,
                    e.confidence_after,
                    truncate(&e.observation, 70)
                ));
            }
        }
        view.render()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HypothesisActionOutput {
    pub success: bool,
    pub message: String,
    pub hypothesis: Hypothesis,
}

impl CommandOutput for HypothesisActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RankOutput {
    pub scores: Vec<HypothesisScore>,
}

impl CommandOutput for RankOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "rank", "id", "total", "conf", "learn", "time", "edge", "statement",
        ]);
        for (i, s) in self.scores.iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                s.hypothesis_id.clone(),
                format!("{:.3}", s.total),
                format!("{:.2}", s.confidence),
                format!("{:.2}", s.learning_support),
                format!("{:.2}", s.time_sensitivity),
                format!("{:.2}", s.edge),
                truncate(&s.statement, 40),
            ]);
        }
        render_list("ranked hypothesis", "ranked hypotheses", &table, self.scores.len())
    }
}

// -- Execute --

pub async fn execute(args: HypothesisArgs, config: Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let service = ctx.hypotheses();

    match args.command {
        HypothesisCommands::Create {
            statement,
            rationale,
            test_method,
            entry_rules,
            exit_rules,
            confidence,
            markets,
            min_sample_size,
            expected_payoff,
            tags,
        } => {
            let hypothesis = service
                .create(NewHypothesis {
                    statement,
                    rationale,
                    test_method,
                    entry_rules,
                    exit_rules,
                    confidence,
                    markets,
                    min_sample_size,
                    expected_payoff,
                    tags,
                })
                .await?;
            let out = HypothesisActionOutput {
                success: true,
                message: format!(
                    "Created hypothesis {} at confidence {:.2}",
                    hypothesis.id, hypothesis.confidence
                ),
                hypothesis,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let hypotheses = service.list(status).await?;
            let out = HypothesisListOutput {
                total: hypotheses.len(),
                hypotheses,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::Show { id } => {
            let hypothesis = service.get(&id).await?;
            output(&HypothesisDetailOutput { hypothesis }, json_mode);
        }

        HypothesisCommands::Transition { id, status, reason } => {
            let to = parse_status(&status)?;
            let hypothesis = service.transition(&id, to, reason.as_deref()).await?;
            let out = HypothesisActionOutput {
                success: true,
                message: format!("Hypothesis {} is now {}", hypothesis.id, hypothesis.status),
                hypothesis,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::Evidence {
            id,
            observation,
            delta,
            supports,
            contradicts,
        } => {
            let support = match (supports, contradicts) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let (hypothesis, outcome) = service
                .add_evidence(&id, &observation, support, delta)
                .await?;
            let mut message = format!(
                "Evidence recorded on {}: confidence {:.2} -> {:.2}",
                hypothesis.id, outcome.previous_confidence, outcome.confidence
            );
            if let Some(effects) = &outcome.auto_transition {
                message.push_str(&format!("\nAutomatically moved {} -> {}", effects.from, effects.to));
            }
            let out = HypothesisActionOutput {
                success: true,
                message,
                hypothesis,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::Trade { id, won, pnl } => {
            let hypothesis = service.record_trade(&id, won, pnl).await?;
            let out = HypothesisActionOutput {
                success: true,
                message: format!(
                    "Recorded {} on {}: {} trade(s), win rate {:.0}%",
                    if won { "win" } else { "loss" },
                    hypothesis.id,
                    hypothesis.test_results.trades,
                    hypothesis.test_results.win_rate * 100.0
                ),
                hypothesis,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::Evaluate { id } => {
            let (hypothesis, moved) = service.evaluate(&id).await?;
            let message = match moved {
                Some(to) => format!("Hypothesis {} moved to {to}", hypothesis.id),
                None => format!("Hypothesis {} unchanged ({})", hypothesis.id, hypothesis.status),
            };
            let out = HypothesisActionOutput {
                success: true,
                message,
                hypothesis,
            };
            output(&out, json_mode);
        }

        HypothesisCommands::Rank => {
            let hypotheses = service.list(None).await?;
            let learnings = service.learnings().await?;
            let scores = HypothesisRanker::new().rank(&hypotheses, &learnings);
            output(&RankOutput { scores }, json_mode);
        }
    }

    Ok(())
}

fn parse_status(s: &str) -> Result<HypothesisStatus> {
    HypothesisStatus::from_str(s).with_context(|| {
        format!("Unknown status '{s}'. Use proposed, testing, validated, invalidated or blocked")
    })
}

fn parse_market(s: &str) -> Result<TrackedMarket, String> {
    let (id, close_time) = match s.split_once('@') {
        Some((id, at)) => {
            let at = DateTime::parse_from_rfc3339(at)
                .map_err(|e| format!("invalid close time '{at}': {e}"))?
                .with_timezone(&Utc);
            (id, Some(at))
        }
        None => (s, None),
    };
    if id.trim().is_empty() {
        return Err("market id cannot be empty".to_string());
    }
    Ok(TrackedMarket {
        id: id.trim().to_string(),
        question: String::new(),
        close_time,
    })
}
