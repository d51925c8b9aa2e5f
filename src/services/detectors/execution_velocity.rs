//! Execution velocity: are enough paper trades being placed?

use chrono::Duration;

use crate::domain::models::{
    Priority, PriorityAction, PriorityContext, PriorityType, StoreSnapshot, VelocityConfig,
};
use crate::services::prompts::priority_instructions;

use super::SignalDetector;

pub const URGENCY_NO_TRADES: u8 = 70;
pub const URGENCY_BELOW_TARGET: u8 = 50;

pub struct ExecutionVelocityDetector {
    config: VelocityConfig,
}

impl ExecutionVelocityDetector {
    pub fn new(config: VelocityConfig) -> Self {
        Self { config }
    }

    /// Trades opened inside the trailing window, open or already closed.
    pub fn trades_in_window(&self, snapshot: &StoreSnapshot) -> usize {
        let since = snapshot.taken_at - Duration::days(i64::from(self.config.window_days));
        let open = snapshot
            .portfolio
            .positions
            .iter()
            .filter(|p| p.opened_at >= since)
            .count();
        let closed = snapshot
            .trades
            .iter()
            .filter(|t| t.opened_at >= since)
            .count();
        open + closed
    }
}

impl SignalDetector for ExecutionVelocityDetector {
    fn priority_type(&self) -> PriorityType {
        PriorityType::ExecutionVelocity
    }

    fn detect(&self, snapshot: &StoreSnapshot) -> Vec<Priority> {
        let trades = self.trades_in_window(snapshot);
        let target = self.config.min_trades_per_week;
        if trades >= target as usize {
            return Vec::new();
        }
        let urgency = if trades == 0 {
            URGENCY_NO_TRADES
        } else {
            URGENCY_BELOW_TARGET
        };

        let summary = format!(
            "{trades} trades in the last {} days, target {target}",
            self.config.window_days
        );
        let context = PriorityContext::Velocity {
            trades_in_window: trades,
            target,
            window_days: self.config.window_days,
        };
        let action = PriorityAction::IncreaseTradingVelocity;
        let instructions = priority_instructions(action, &summary, &context);
        vec![Priority::for_worker(
            PriorityType::ExecutionVelocity,
            urgency,
            action,
            summary,
            context,
            instructions,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExitReason, Position, TradeRecord};
    use chrono::Utc;

    fn position(id: &str, days_ago: i64) -> Position {
        Position {
            id: id.to_string(),
            market_id: "m".to_string(),
            market_question: String::new(),
            side: "YES".to_string(),
            shares: 10.0,
            entry_price: 0.5,
            current_price: 0.5,
            stop_loss: None,
            take_profit: None,
            hypothesis_id: None,
            opened_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn detect(snapshot: &StoreSnapshot) -> Vec<u8> {
        ExecutionVelocityDetector::new(VelocityConfig::default())
            .detect(snapshot)
            .iter()
            .map(|p| p.urgency)
            .collect()
    }

    #[test]
    fn test_no_trades() {
        let snapshot = StoreSnapshot::empty(Utc::now());
        assert_eq!(detect(&snapshot), vec![70]);
    }

    #[test]
    fn test_counts_open_and_closed_in_window() {
        let mut snapshot = StoreSnapshot::empty(Utc::now());
        snapshot.portfolio.positions = vec![position("a", 1), position("old", 30)];
        snapshot.trades = vec![TradeRecord::closing(
            &position("b", 2),
            0.6,
            ExitReason::Manual,
            Utc::now(),
        )];
        assert_eq!(detect(&snapshot), vec![50]);

        snapshot.portfolio.positions = (0..5).map(|i| position(&format!("p{i}"), 1)).collect();
        assert!(detect(&snapshot).is_empty());
    }
}
