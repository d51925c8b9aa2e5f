//! Paper portfolio: cash, open positions, and the closed-trade log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open paper position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub market_id: String,
    #[serde(default)]
    pub market_question: String,
    /// Outcome side held, e.g. `YES` or `NO`.
    #[serde(default)]
    pub side: String,
    pub shares: f64,
    pub entry_price: f64,
    pub current_price: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub hypothesis_id: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Unrealized P&L as a percentage of entry price.
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (self.current_price - self.entry_price) / self.entry_price * 100.0
    }

    /// Realized P&L if closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.shares
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Manual,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::Manual => "manual",
        }
    }
}

/// A closed trade in the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub position_id: String,
    pub market_id: String,
    #[serde(default)]
    pub hypothesis_id: Option<String>,
    pub shares: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Build the log entry for closing `position` at `exit_price`.
    pub fn closing(
        position: &Position,
        exit_price: f64,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("trade_{}", &Uuid::new_v4().simple().to_string()[..12]),
            position_id: position.id.clone(),
            market_id: position.market_id.clone(),
            hypothesis_id: position.hypothesis_id.clone(),
            shares: position.shares,
            entry_price: position.entry_price,
            exit_price,
            pnl: position.pnl_at(exit_price),
            reason,
            opened_at: position.opened_at,
            closed_at: now,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Cash plus open positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Portfolio {
    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Remove a position and credit `shares * price` to cash.
    ///
    /// Returns `None` when the position is already gone, which makes closing
    /// idempotent.
    pub fn close_position(&mut self, id: &str, price: f64, now: DateTime<Utc>) -> Option<Position> {
        let idx = self.positions.iter().position(|p| p.id == id)?;
        let position = self.positions.remove(idx);
        self.cash += position.shares * price;
        self.updated_at = Some(now);
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(entry: f64, current: f64) -> Position {
        Position {
            id: "p1".to_string(),
            market_id: "m1".to_string(),
            market_question: String::new(),
            side: "YES".to_string(),
            shares: 100.0,
            entry_price: entry,
            current_price: current,
            stop_loss: Some(0.05),
            take_profit: None,
            hypothesis_id: None,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_pnl_pct() {
        assert!((position(0.10, 0.075).pnl_pct() + 25.0).abs() < 1e-9);
        assert!((position(0.0, 0.5).pnl_pct()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_close_position_is_idempotent() {
        let mut portfolio = Portfolio {
            cash: 10.0,
            positions: vec![position(0.10, 0.045)],
            updated_at: None,
        };
        let now = Utc::now();
        let closed = portfolio.close_position("p1", 0.045, now);
        assert!(closed.is_some());
        assert!((portfolio.cash - 14.5).abs() < 1e-9);
        assert!(portfolio.positions.is_empty());

        assert!(portfolio.close_position("p1", 0.045, now).is_none());
        assert!((portfolio.cash - 14.5).abs() < 1e-9);
    }
}
