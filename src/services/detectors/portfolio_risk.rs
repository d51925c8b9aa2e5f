//! Portfolio risk: losses, stop proximity, and the two price rails.

use crate::domain::models::{
    PortfolioRiskConfig, Position, Priority, PriorityAction, PriorityContext, PriorityType,
    StoreSnapshot,
};
use crate::services::prompts::priority_instructions;

use super::SignalDetector;

pub const URGENCY_STOP_LOSS: u8 = 99;
pub const URGENCY_TAKE_PROFIT: u8 = 98;
pub const URGENCY_CRITICAL_LOSS: u8 = 95;
pub const URGENCY_STOP_PROXIMITY: u8 = 85;
pub const URGENCY_WARNING_LOSS: u8 = 75;

pub struct PortfolioRiskDetector {
    config: PortfolioRiskConfig,
}

impl PortfolioRiskDetector {
    pub fn new(config: PortfolioRiskConfig) -> Self {
        Self { config }
    }

    fn scan_position(&self, position: &Position, out: &mut Vec<Priority>) {
        let pnl_pct = position.pnl_pct();
        let price = position.current_price;
        let context = || PriorityContext::Position {
            position_id: position.id.clone(),
            market_id: position.market_id.clone(),
            pnl_pct,
            entry_price: position.entry_price,
            current_price: price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
        };

        // Both rails are checked on their own; they test different prices.
        if let Some(stop) = position.stop_loss {
            if price <= stop {
                out.push(Priority::for_code(
                    PriorityType::PortfolioRisk,
                    URGENCY_STOP_LOSS,
                    PriorityAction::ExecuteStopLoss,
                    format!("{} hit stop-loss {stop:.3} at {price:.3}", position.id),
                    context(),
                ));
            } else if price <= stop * (1.0 + self.config.stop_proximity_pct / 100.0) {
                self.push_review(
                    out,
                    URGENCY_STOP_PROXIMITY,
                    PriorityAction::ReviewStopProximity,
                    format!("{} at {price:.3} is near stop-loss {stop:.3}", position.id),
                    context(),
                );
            }
        }
        if let Some(target) = position.take_profit {
            if price >= target {
                out.push(Priority::for_code(
                    PriorityType::PortfolioRisk,
                    URGENCY_TAKE_PROFIT,
                    PriorityAction::ExecuteTakeProfit,
                    format!("{} hit take-profit {target:.3} at {price:.3}", position.id),
                    context(),
                ));
            }
        }

        if pnl_pct <= self.config.critical_loss_pct {
            self.push_review(
                out,
                URGENCY_CRITICAL_LOSS,
                PriorityAction::ReviewCriticalLoss,
                format!("{} is down {pnl_pct:.1}%", position.id),
                context(),
            );
        } else if pnl_pct <= self.config.warning_loss_pct {
            self.push_review(
                out,
                URGENCY_WARNING_LOSS,
                PriorityAction::ReviewPositionLoss,
                format!("{} is down {pnl_pct:.1}%", position.id),
                context(),
            );
        }
    }

    fn push_review(
        &self,
        out: &mut Vec<Priority>,
        urgency: u8,
        action: PriorityAction,
        summary: String,
        context: PriorityContext,
    ) {
        let instructions = priority_instructions(action, &summary, &context);
        out.push(Priority::for_worker(
            PriorityType::PortfolioRisk,
            urgency,
            action,
            summary,
            context,
            instructions,
        ));
    }
}

impl SignalDetector for PortfolioRiskDetector {
    fn priority_type(&self) -> PriorityType {
        PriorityType::PortfolioRisk
    }

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        let mut out = Vec::new();
        for position in &snapshot.portfolio.positions {
            self.scan_position(position, &mut out);
        }
        out
    }
}
