//! Focused worker instructions.
//!
//! The worker gets one narrow job per dispatch. Each prompt names the job,
//! gives the facts the detector saw, and says what "done" looks like.

use std::fmt::Write as _;

use crate::domain::models::{Handoff, PriorityAction, PriorityContext, Responsibility};

/// Instructions for a worker-dispatched priority.
pub fn priority_instructions(
    action: PriorityAction,
    summary: &str,
    context: &PriorityContext,
) -> String {
    let goal = match action {
        PriorityAction::ReviewCriticalLoss => {
            "Decide whether to exit this position now. Re-check the thesis that opened it \
             and the current market. Close it if the thesis is broken, otherwise tighten the stop."
        }
        PriorityAction::ReviewPositionLoss => {
            "Review this losing position. Confirm the thesis still holds or reduce exposure."
        }
        PriorityAction::ReviewStopProximity => {
            "Price is close to the stop-loss. Decide whether to keep, move, or execute the stop."
        }
        PriorityAction::ReviewMarketClose => {
            "A tracked market is about to close. Record final evidence for the hypothesis \
             and settle any open exposure before resolution."
        }
        PriorityAction::AdvanceProposedHypothesis => {
            "This hypothesis has sat in proposed too long. Add entry rules and move it to \
             testing, or invalidate it with a conclusion."
        }
        PriorityAction::RescueLowConfidence => {
            "This hypothesis is testing with low confidence. Gather evidence that could \
             change the picture, or invalidate it."
        }
        PriorityAction::IncreaseTradingVelocity => {
            "Too few paper trades were placed recently. Find testable hypotheses with open \
             markets and place trades against their entry rules."
        }
        PriorityAction::BootstrapHealthCheck => {
            "No health record exists. Run the health check and write its report."
        }
        PriorityAction::InvestigateErrorSpike => {
            "Errors spiked in the last hour. Find the failing component and fix or disable it."
        }
        PriorityAction::RestoreService => {
            "A service is reported down. Diagnose it and bring it back."
        }
        PriorityAction::InvestigatePipelineFailures => {
            "A pipeline keeps failing. Read its recent output, find the cause, and fix it."
        }
        PriorityAction::RestoreStateFile => {
            "A critical state file is missing. Restore it from sync history or rebuild it."
        }
        PriorityAction::ExecuteStopLoss
        | PriorityAction::ExecuteTakeProfit
        | PriorityAction::RefreshHealthCheck
        | PriorityAction::NoteStaleStateFile => "Handle the situation below.",
    };

    let mut prompt = format!("Task: {}\n\n{goal}\n\nSituation: {summary}\n", action.as_str());
    if let Ok(facts) = serde_json::to_string_pretty(context) {
        let _ = write!(prompt, "\nDetails:\n{facts}\n");
    }
    prompt.push_str("\nDo only this task, update the state store, then exit.");
    prompt
}

/// Instructions for a due responsibility.
pub fn responsibility_instructions(responsibility: &Responsibility) -> String {
    let mut prompt = format!(
        "Role: {}\nDuty: {} (every {})\n",
        responsibility.role, responsibility.name, responsibility.frequency
    );
    if let Some(last) = responsibility.last_run {
        let _ = writeln!(prompt, "Last done: {}", last.to_rfc3339());
    } else {
        prompt.push_str("Last done: never\n");
    }
    if !responsibility.instructions.trim().is_empty() {
        let _ = write!(prompt, "\n{}\n", responsibility.instructions.trim());
    }
    prompt.push_str("\nDo only this duty, update the state store, then exit.");
    prompt
}

/// Instructions for a handoff picked up by its target role.
pub fn handoff_instructions(handoff: &Handoff) -> String {
    let mut prompt = format!(
        "Role: {}\nHandoff from {}: {} ({} priority)\n",
        handoff.to_role, handoff.from_role, handoff.handoff_type, handoff.priority
    );
    if let Some(id) = &handoff.context.hypothesis_id {
        let _ = writeln!(prompt, "Hypothesis: {id}");
    }
    if let Some(reason) = &handoff.context.reason {
        let _ = writeln!(prompt, "Reason: {reason}");
    }
    if let Some(notes) = &handoff.context.notes {
        let _ = write!(prompt, "\n{notes}\n");
    }
    if !handoff.context.extra.is_empty() {
        if let Ok(extra) = serde_json::to_string_pretty(&handoff.context.extra) {
            let _ = write!(prompt, "\nContext:\n{extra}\n");
        }
    }
    prompt.push_str("\nResolve this handoff, update the state store, then exit.");
    prompt
}
